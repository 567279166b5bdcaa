use crate::cpu6502::CPU;

impl CPU {
    // A - M - (1 - C) is the same nine-bit sum as A + !M + C, so SBC is ADC
    // with the operand complemented.
    pub(crate) fn handle_sbc(&mut self, opt_address: Option<u16>) -> u8 {
        let address = opt_address.expect("BUG: SBC requires a memory operand");
        let value = self.read_u8(address);
        self.add_with_carry(!value);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu6502::{Status, new_cpu};
    use crate::memory::Ram;

    #[test]
    fn test_sbc_with_borrow_clear() {
        let mut cpu = new_cpu(Ram::new());
        cpu.accumulator = 0x33;
        cpu.status_register.insert(Status::CARRY);
        cpu.write_u8(0x0010, 0x11);
        cpu.handle_sbc(Some(0x0010));
        assert_eq!(cpu.accumulator, 0x22);
        assert!(cpu.status_register.contains(Status::CARRY));
    }

    #[test]
    fn test_sbc_underflow_borrows() {
        let mut cpu = new_cpu(Ram::new());
        cpu.accumulator = 0x33;
        cpu.status_register.insert(Status::CARRY);
        cpu.write_u8(0x0010, 0x34);
        cpu.handle_sbc(Some(0x0010));
        assert_eq!(cpu.accumulator, 0xFF);
        assert!(!cpu.status_register.contains(Status::CARRY));
        assert!(cpu.status_register.contains(Status::NEGATIVE));
    }

    #[test]
    fn test_sbc_signed_overflow() {
        // -128 - 1 leaves the signed range.
        let mut cpu = new_cpu(Ram::new());
        cpu.accumulator = 0x80;
        cpu.status_register.insert(Status::CARRY);
        cpu.write_u8(0x0010, 0x01);
        cpu.handle_sbc(Some(0x0010));
        assert_eq!(cpu.accumulator, 0x7F);
        assert!(cpu.status_register.contains(Status::OVERFLOW));
    }

    #[test]
    fn test_sbc_then_adc_restores_a_and_c() {
        // Exhaustive: subtracting and re-adding the same operand must restore
        // the accumulator and the carry for every A, M and carry-in.
        let mut cpu = new_cpu(Ram::new());
        for a in 0..=0xFFu8 {
            for m in 0..=0xFFu8 {
                for c in [false, true] {
                    cpu.accumulator = a;
                    cpu.status_register.set(Status::CARRY, c);
                    cpu.write_u8(0x0010, m);

                    cpu.handle_sbc(Some(0x0010));
                    cpu.handle_adc(Some(0x0010));

                    assert_eq!(cpu.accumulator, a, "A for {:02x} - {:02x} (C={})", a, m, c);
                    assert_eq!(
                        cpu.status_register.contains(Status::CARRY),
                        c,
                        "C for {:02x} - {:02x} (C={})",
                        a,
                        m,
                        c
                    );
                }
            }
        }
    }
}
