use crate::cpu6502::{CPU, Status};

impl CPU {
    pub(crate) fn handle_cli(&mut self, _opt_address: Option<u16>) -> u8 {
        self.status_register.remove(Status::INTERRUPT_DISABLE);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu6502::new_cpu;
    use crate::memory::Ram;

    #[test]
    fn test_cli_unmasks_interrupts() {
        let mut cpu = new_cpu(Ram::new());
        cpu.status_register.insert(Status::INTERRUPT_DISABLE);
        cpu.handle_cli(None);
        assert!(!cpu.status_register.contains(Status::INTERRUPT_DISABLE));
    }
}
