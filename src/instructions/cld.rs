use crate::cpu6502::{CPU, Status};

impl CPU {
    pub(crate) fn handle_cld(&mut self, _opt_address: Option<u16>) -> u8 {
        self.status_register.remove(Status::DECIMAL);
        0
    }
}
