use crate::cpu6502::{CPU, Status};

impl CPU {
    // Bit test: N and V mirror bits 7 and 6 of the operand, Z reports
    // whether the accumulator mask selects nothing. A itself is untouched.
    pub(crate) fn handle_bit(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: BIT requires a memory operand");
        let value = self.read_u8(address);

        self.status_register.set(Status::NEGATIVE, value & 0x80 != 0);
        self.status_register.set(Status::OVERFLOW, value & 0x40 != 0);
        self.status_register.set(Status::ZERO, value & self.accumulator == 0);
        0
    }
}
