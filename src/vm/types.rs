/// Outcome of one successfully executed machine step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep executing instructions in the current frame.
    Continue,
    /// A draw completed; present the framebuffer before stepping again.
    FrameReady,
    /// Blocked on a key wait; the program counter holds until a fresh
    /// press is observed.
    AwaitingKey,
}

/// Faults the machine can raise. All of them leave the machine in its last
/// consistent state for inspection.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("ROM is too large ({size} bytes), capacity is {capacity} bytes")]
    RomTooLarge { size: usize, capacity: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryFault { address: u16 },

    #[error("Invalid opcode: {opcode:#06X}")]
    InvalidOpcode { opcode: u16 },

    #[error("Stack overflow: subroutine calls nested deeper than 16 levels")]
    StackOverflow,

    #[error("Stack underflow: return with an empty call stack")]
    StackUnderflow,
}
