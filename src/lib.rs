pub mod debugger;
mod nibble;
pub mod vm;

pub use nibble::{u4, u12};
pub use vm::{
    AluOp, DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer, InvalidOpcodePolicy, Machine, MachineError,
    Opcode, PixelGrid, Runner, RunnerConfig, RunnerOutcome, StepOutcome,
};
