//! The CHIP-8 virtual machine: state, instruction set and pacing.

mod execute;
mod font;
mod framebuffer;
mod keypad;
mod machine;
mod memory;
mod opcode;
mod runner;
mod timers;
mod types;

pub use font::*;
pub use framebuffer::*;
pub use keypad::*;
pub use machine::*;
pub use memory::*;
pub use opcode::*;
pub use runner::*;
pub use timers::*;
pub use types::*;
