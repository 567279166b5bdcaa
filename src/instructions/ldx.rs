use crate::cpu6502::CPU;

impl CPU {
    pub(crate) fn handle_ldx(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: LDX requires a memory operand");
        self.x_register = self.read_u8(address);
        self.set_nz(self.x_register);
        0
    }
}
