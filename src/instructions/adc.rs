use crate::cpu6502::{CPU, Status};

impl CPU {
    // ADC and SBC both funnel through here. Only binary arithmetic is
    // implemented: the D flag is ignored and a decimal-mode program gets
    // binary results.
    pub(crate) fn add_with_carry(&mut self, value: u8) {
        let sum = self.accumulator as u16 + value as u16 + self.carry_in() as u16;
        let result = sum as u8;

        // Overflow: both operands agree on the sign bit and the result does
        // not.
        let overflow = (self.accumulator ^ result) & (value ^ result) & 0x80 != 0;
        self.status_register.set(Status::OVERFLOW, overflow);

        self.accumulator = result;
        self.set_nz(result);
        self.status_register.set(Status::CARRY, sum > 0xFF);
    }

    pub(crate) fn handle_adc(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: ADC requires a memory operand");
        let value = self.read_u8(address);
        self.add_with_carry(value);
        0
    }
}
