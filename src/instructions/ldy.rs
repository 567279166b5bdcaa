use crate::cpu6502::CPU;

impl CPU {
    pub(crate) fn handle_ldy(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: LDY requires a memory operand");
        self.y_register = self.read_u8(address);
        self.set_nz(self.y_register);
        0
    }
}
