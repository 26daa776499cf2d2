use super::commands::{BreakpointAction, Command, CommandError, CommandOutcome, SetTarget};
use crate::u12;
use crate::vm::{MachineError, Opcode, PixelGrid, Runner, RunnerOutcome};
use std::collections::HashSet;

/// A machine under debugger control: the runner, the run/pause state and
/// the breakpoint set.
pub struct Session {
    running: bool,
    runner: Runner,
    breakpoints: HashSet<u12>,
}

impl Session {
    pub fn new(runner: Runner) -> Self {
        Self {
            running: false,
            runner,
            breakpoints: HashSet::new(),
        }
    }

    /// Advances the machine when running. Errors and breakpoint hits drop
    /// the session back to paused.
    pub fn poll(&mut self, dt: f32) -> Result<RunnerOutcome, MachineError> {
        if !self.running {
            return Ok(RunnerOutcome::Ok);
        }

        let result = self
            .runner
            .update_with_breakpoints(dt, Some(&self.breakpoints));

        if matches!(result, Err(_) | Ok(RunnerOutcome::HitBreakpoint)) {
            self.running = false;
        }

        result
    }

    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::Run => {
                self.running = true;
                Ok(CommandOutcome::Ok)
            }
            Command::Pause => {
                self.pause();
                Ok(CommandOutcome::Ok)
            }
            Command::Step => {
                self.runner.machine_mut().step()?;
                Ok(CommandOutcome::Ok)
            }
            Command::Breakpoint { action } => self.handle_breakpoint(action),
            Command::Set { target, value } => self.handle_set(target, value),
            Command::Mem { start, len } => Ok(self.mem_dump(start, len)),
            Command::Disasm { start, count } => Ok(self.disassemble(start, count)),
            Command::Quit => Ok(CommandOutcome::Quit),
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn display(&self) -> &PixelGrid<bool> {
        self.runner.machine().framebuffer().snapshot()
    }

    pub fn pc(&self) -> u16 {
        self.runner.machine().pc
    }

    pub fn i(&self) -> u16 {
        self.runner.machine().i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.runner.machine().v
    }

    pub fn stack(&self) -> &[u16] {
        &self.runner.machine().stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.runner.machine().timers.delay()
    }

    pub fn sound_timer(&self) -> u8 {
        self.runner.machine().timers.sound()
    }

    pub fn keypad(&self) -> [bool; 16] {
        self.runner.machine().keypad.snapshot()
    }

    pub fn runner_mut(&mut self) -> &mut Runner {
        &mut self.runner
    }

    fn handle_breakpoint(
        &mut self,
        action: BreakpointAction,
    ) -> Result<CommandOutcome, CommandError> {
        match action {
            BreakpointAction::Set { addr } => {
                let addr = u12::try_new(addr).ok_or(CommandError::ValueOutOfRange)?;
                self.breakpoints.insert(addr);
            }
            BreakpointAction::Clear { addr } => {
                let addr = u12::try_new(addr).ok_or(CommandError::ValueOutOfRange)?;
                self.breakpoints.remove(&addr);
            }
            BreakpointAction::ClearAll => {
                self.breakpoints.clear();
            }
            BreakpointAction::List => {
                let mut addresses: Vec<u16> =
                    self.breakpoints.iter().map(|addr| addr.value()).collect();
                addresses.sort_unstable();
                return Ok(CommandOutcome::Breakpoints(addresses));
            }
        };

        Ok(CommandOutcome::Ok)
    }

    fn handle_set(&mut self, target: SetTarget, value: u16) -> Result<CommandOutcome, CommandError> {
        let machine = self.runner.machine_mut();

        match target {
            SetTarget::V(reg) => {
                machine.v[reg] =
                    u8::try_from(value).map_err(|_| CommandError::ValueOutOfRange)?;
            }
            SetTarget::I => {
                machine.i = value;
            }
            SetTarget::Pc => {
                machine.pc = value;
            }
        }

        Ok(CommandOutcome::Ok)
    }

    fn mem_dump(&self, start: u16, len: u16) -> CommandOutcome {
        let data = self
            .runner
            .machine()
            .memory()
            .view(start, len as usize)
            .to_vec();

        CommandOutcome::MemDump {
            data,
            offset: start,
        }
    }

    fn disassemble(&self, start: u16, count: u16) -> CommandOutcome {
        let memory = self.runner.machine().memory();

        let mut listing = Vec::new();
        let mut addr = start;
        for _ in 0..count {
            let &[high, low] = memory.view(addr, 2) else {
                // Ran past the end of memory
                break;
            };

            let word = u16::from_be_bytes([high, low]);
            listing.push((word, Opcode::decode(word)));
            addr = addr.wrapping_add(2);
        }

        CommandOutcome::Disasm {
            listing,
            offset: start,
        }
    }
}
