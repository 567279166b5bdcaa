use crate::cpu6502::{CPU, Status};

impl CPU {
    // The D flag is tracked even though decimal-mode arithmetic is not
    // implemented; ADC and SBC stay binary regardless.
    pub(crate) fn handle_sed(&mut self, _opt_address: Option<u16>) -> u8 {
        self.status_register.insert(Status::DECIMAL);
        0
    }
}
