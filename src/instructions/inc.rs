use crate::cpu6502::CPU;

impl CPU {
    // Read-modify-write: read, bump, single write back.
    pub(crate) fn handle_inc(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: INC requires a memory operand");
        let result = self.read_u8(address).wrapping_add(1);
        self.write_u8(address, result);
        self.set_nz(result);
        0
    }
}
