use crate::cpu6502::CPU;

impl CPU {
    pub(crate) fn handle_dec(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: DEC requires a memory operand");
        let result = self.read_u8(address).wrapping_sub(1);
        self.write_u8(address, result);
        self.set_nz(result);
        0
    }
}
