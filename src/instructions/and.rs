use crate::cpu6502::CPU;

impl CPU {
    pub(crate) fn handle_and(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: AND requires a memory operand");
        self.accumulator &= self.read_u8(address);
        self.set_nz(self.accumulator);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu6502::{Status, new_cpu};
    use crate::memory::Ram;

    #[test]
    fn test_and_masks_the_accumulator() {
        let mut cpu = new_cpu(Ram::new());
        cpu.accumulator = 0b1010_1010;
        cpu.write_u8(0x0010, 0b1111_0000);
        cpu.handle_and(Some(0x0010));
        assert_eq!(cpu.accumulator, 0b1010_0000);
        assert!(cpu.status_register.contains(Status::NEGATIVE));
        assert!(!cpu.status_register.contains(Status::ZERO));
    }

    #[test]
    fn test_and_sets_zero_on_disjoint_masks() {
        let mut cpu = new_cpu(Ram::new());
        cpu.accumulator = 0x0F;
        cpu.write_u8(0x0010, 0xF0);
        cpu.handle_and(Some(0x0010));
        assert_eq!(cpu.accumulator, 0x00);
        assert!(cpu.status_register.contains(Status::ZERO));
    }
}
