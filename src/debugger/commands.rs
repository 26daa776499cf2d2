use clap::{Parser, Subcommand};
use clap_num::maybe_hex;

use crate::u4;
use crate::vm::{MachineError, Opcode};

/// Grammar of the debugger command line. Parsed with `multicall` so the
/// command name itself is the first token.
#[derive(Parser)]
#[command(multicall = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    #[command(visible_alias = "r")]
    Run,

    #[command(visible_alias = "p")]
    Pause,

    #[command(visible_alias = "s")]
    Step,

    #[command(visible_alias = "b")]
    Breakpoint {
        #[command(subcommand)]
        action: BreakpointAction,
    },

    Set {
        #[arg(value_parser = parse_set_target)]
        target: SetTarget,
        #[arg(value_parser = maybe_hex::<u16>)]
        value: u16,
    },

    #[command(visible_alias = "m")]
    Mem {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "64", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    #[command(visible_alias = "d")]
    Disasm {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "16", value_parser = maybe_hex::<u16>)]
        count: u16,
    },

    #[command(visible_alias = "q")]
    Quit,
}

#[derive(Subcommand, Clone)]
pub enum BreakpointAction {
    #[command(visible_alias = "s")]
    Set {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "c")]
    Clear {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "l")]
    List,

    #[command(visible_alias = "ca")]
    ClearAll,
}

/// What a successfully executed command hands back to the UI.
pub enum CommandOutcome {
    Ok,
    Breakpoints(Vec<u16>),
    MemDump { data: Vec<u8>, offset: u16 },
    Disasm { listing: Vec<(u16, Opcode)>, offset: u16 },
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Execution fault: {0}")]
    Machine(#[from] MachineError),
    #[error("Value out of range")]
    ValueOutOfRange,
}

#[derive(Clone, Copy)]
pub enum SetTarget {
    V(u4),
    I,
    Pc,
}

fn parse_set_target(s: &str) -> Result<SetTarget, String> {
    let lower = s.to_ascii_lowercase();

    match lower.as_str() {
        "i" | "index" => Ok(SetTarget::I),
        "pc" => Ok(SetTarget::Pc),

        _ => match lower.strip_prefix('v').map(|reg| u8::from_str_radix(reg, 16)) {
            Some(Ok(reg)) if reg < 16 => Ok(SetTarget::V(u4::new(reg))),
            _ => Err(format!("unknown target: '{s}'")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Cli::try_parse_from(line.split_whitespace()).map(|cli| cli.command)
    }

    #[test]
    fn parses_commands_and_aliases() {
        assert!(matches!(parse("run"), Ok(Command::Run)));
        assert!(matches!(parse("r"), Ok(Command::Run)));
        assert!(matches!(parse("s"), Ok(Command::Step)));
        assert!(matches!(parse("q"), Ok(Command::Quit)));
        assert!(parse("bogus").is_err());
    }

    #[test]
    fn parses_breakpoint_actions_with_hex_addresses() {
        assert!(matches!(
            parse("b s 0x200"),
            Ok(Command::Breakpoint {
                action: BreakpointAction::Set { addr: 0x200 }
            })
        ));
        assert!(matches!(
            parse("breakpoint clear 512"),
            Ok(Command::Breakpoint {
                action: BreakpointAction::Clear { addr: 512 }
            })
        ));
        assert!(matches!(
            parse("b ca"),
            Ok(Command::Breakpoint {
                action: BreakpointAction::ClearAll
            })
        ));
    }

    #[test]
    fn parses_set_targets() {
        assert!(matches!(
            parse("set va 0xFF"),
            Ok(Command::Set {
                target: SetTarget::V(reg),
                value: 0xFF
            }) if reg == u4::new(0xA)
        ));
        assert!(matches!(
            parse("set pc 0x300"),
            Ok(Command::Set {
                target: SetTarget::Pc,
                value: 0x300
            })
        ));
        assert!(matches!(
            parse("set index 5"),
            Ok(Command::Set {
                target: SetTarget::I,
                value: 5
            })
        ));
        assert!(parse("set vx 1").is_err());
        assert!(parse("set w 1").is_err());
    }

    #[test]
    fn mem_and_disasm_have_defaults() {
        assert!(matches!(
            parse("m"),
            Ok(Command::Mem {
                start: 0x200,
                len: 64
            })
        ));
        assert!(matches!(
            parse("d 0x250 4"),
            Ok(Command::Disasm {
                start: 0x250,
                count: 4
            })
        ));
    }
}
