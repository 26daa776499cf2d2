//! Command grammar and session state for the interactive debugger.

mod commands;
mod session;

pub use commands::*;
pub use session::*;
