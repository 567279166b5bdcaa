mod cpu6502;
mod instructions;
mod memory;

use crate::cpu6502::new_cpu;
use crate::memory::Ram;

// Klaus Dormann's 6502 functional test: loaded at 0x0400, it walks every
// documented instruction and loops forever on the success label once done.
// A divergence shows up as a tight loop on some other trap address.
const LOAD_ADDRESS: u16 = 0x0400;
const SUCCESS_ADDRESS: u16 = 0x36B9;
const LAST_ADDRESS: u16 = 0x3A19;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let path = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "./6502_functional_test.bin".to_string());

    let mut ram = Ram::new();
    let loaded = if path.ends_with(".hex") {
        ram.load_hex_file(LOAD_ADDRESS, &path)
    } else {
        ram.load_bin_file(LOAD_ADDRESS, &path)
    };
    let size = loaded.expect("Failed to load program image");
    println!("Loaded {} bytes from {} at {:#06x}", size, path, LOAD_ADDRESS);

    let mut cpu = new_cpu(ram);
    if args.iter().any(|a| a == "--throttle") {
        cpu.set_throttle(true);
    }

    println!("{}", cpu.info());

    cpu.set_breakpoint(SUCCESS_ADDRESS);
    cpu.execute(LOAD_ADDRESS, LAST_ADDRESS);

    println!("{}", cpu.info());

    if cpu.pc() == SUCCESS_ADDRESS {
        println!("Functional test passed");
    } else {
        println!("Stopped at {:#06x}", cpu.pc());
    }
}
