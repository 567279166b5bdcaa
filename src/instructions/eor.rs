use crate::cpu6502::CPU;

impl CPU {
    pub(crate) fn handle_eor(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: EOR requires a memory operand");
        self.accumulator ^= self.read_u8(address);
        self.set_nz(self.accumulator);
        0
    }
}
