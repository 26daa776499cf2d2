use super::{Machine, MachineError, StepOutcome};
use crate::{u4, u12};
use std::collections::HashSet;

/// Timer cadence fixed by the platform.
const TIMER_HZ: f32 = 60.0;
const TIMER_TIME_STEP: f32 = 1.0 / TIMER_HZ;

const DEFAULT_CPU_HZ: f32 = 700.0;

/// What to do when execution reaches an undecodable word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidOpcodePolicy {
    /// Surface the error and stop.
    #[default]
    Halt,
    /// Log the word, step over it and keep going.
    Skip,
}

/// Tuning knobs for [`Runner`].
#[derive(Clone, Copy, Debug)]
pub struct RunnerConfig {
    /// Instruction rate in Hz.
    pub cpu_hz: f32,
    pub invalid_opcode: InvalidOpcodePolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cpu_hz: DEFAULT_CPU_HZ,
            invalid_opcode: InvalidOpcodePolicy::default(),
        }
    }
}

/// Outcome of one runner update.
pub enum RunnerOutcome {
    HitBreakpoint,
    Ok,
}

/// Drives a [`Machine`] from wall-clock delta times, decoupling the
/// instruction rate from the 60 Hz timer rate.
pub struct Runner {
    machine: Machine,
    config: RunnerConfig,
    cpu_dt_accumulator: f32,
    timer_dt_accumulator: f32,
}

impl Runner {
    pub fn new(machine: Machine) -> Self {
        Self::with_config(machine, RunnerConfig::default())
    }

    pub fn with_config(machine: Machine, config: RunnerConfig) -> Self {
        Self {
            machine,
            config,
            cpu_dt_accumulator: 0.0,
            timer_dt_accumulator: 0.0,
        }
    }

    /// Advances the emulation by `dt` seconds, running as many timer ticks
    /// and machine steps as that much time covers.
    ///
    /// Returns early once a frame should be rendered before the next step.
    pub fn update(&mut self, dt: f32) -> Result<RunnerOutcome, MachineError> {
        self.update_with_breakpoints(dt, None)
    }

    /// Like [`Runner::update`] but stops when the program counter lands on
    /// a breakpoint.
    pub fn update_with_breakpoints(
        &mut self,
        dt: f32,
        breakpoints: Option<&HashSet<u12>>,
    ) -> Result<RunnerOutcome, MachineError> {
        let cpu_time_step = 1.0 / self.config.cpu_hz;

        self.cpu_dt_accumulator += dt;
        self.timer_dt_accumulator += dt;

        while self.timer_dt_accumulator >= TIMER_TIME_STEP {
            self.timer_dt_accumulator -= TIMER_TIME_STEP;
            self.machine.tick_timers();
        }

        while self.cpu_dt_accumulator >= cpu_time_step {
            self.cpu_dt_accumulator -= cpu_time_step;

            let outcome = match self.machine.step() {
                Err(MachineError::InvalidOpcode { opcode })
                    if self.config.invalid_opcode == InvalidOpcodePolicy::Skip =>
                {
                    log::warn!(
                        "skipping invalid opcode {opcode:#06X} at {:#05X}",
                        self.machine.pc
                    );
                    self.machine.skip_instruction();
                    StepOutcome::Continue
                }
                other => other?,
            };

            if let Some(breakpoints) = breakpoints
                && u12::try_new(self.machine.pc).is_some_and(|pc| breakpoints.contains(&pc))
            {
                self.cpu_dt_accumulator = 0.0;
                return Ok(RunnerOutcome::HitBreakpoint);
            }

            match outcome {
                StepOutcome::FrameReady | StepOutcome::AwaitingKey => {
                    // Stop stepping until the next frame. Clearing the
                    // accumulator avoids a catch-up burst afterwards.
                    self.cpu_dt_accumulator = 0.0;
                    break;
                }
                StepOutcome::Continue => {}
            }
        }

        Ok(RunnerOutcome::Ok)
    }

    /// True while the beep should play.
    pub fn sound_active(&self) -> bool {
        self.machine.sound_active()
    }

    /// Sets the level of one keypad key.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.machine.set_key(key, pressed)
    }

    /// State of a single display pixel (true = lit).
    pub fn pixel(&self, y: usize, x: usize) -> bool {
        self.machine.pixel(y, x)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_with(rom: &[u8]) -> Runner {
        let mut machine = Machine::new();
        machine.load(rom).unwrap();
        Runner::new(machine)
    }

    #[test]
    fn update_runs_steps_proportional_to_elapsed_time() {
        // An endless jump-to-self so every step is plain
        let mut runner = runner_with(&[0x12, 0x00, 0x60, 0x01]);
        runner.update(0.1).unwrap();

        // 0.1 s at 700 Hz is 70 steps, none of which made progress
        assert_eq!(runner.machine().pc, 0x200);

        // Less than one cpu period does nothing
        let mut runner = runner_with(&[0x60, 0x01]);
        runner.update(0.0005).unwrap();
        assert_eq!(runner.machine().pc, 0x200);
    }

    #[test]
    fn timers_tick_at_sixty_hz_regardless_of_cpu_rate() {
        let mut runner = runner_with(&[0x12, 0x00]);
        runner.machine_mut().timers.delay = 30;
        runner.update(1.0).unwrap();
        assert_eq!(runner.machine().timers.delay(), 0);

        let mut runner = runner_with(&[0x12, 0x00]);
        runner.machine_mut().timers.delay = 30;
        runner.update(1.0 / 60.0).unwrap();
        assert_eq!(runner.machine().timers.delay(), 29);
    }

    #[test]
    fn a_draw_yields_for_the_frame() {
        // Draw then jump-to-self; only the draw runs before the yield
        let mut runner = runner_with(&[0xD0, 0x01, 0x12, 0x02]);
        runner.update(1.0).unwrap();

        assert_eq!(runner.machine().pc, 0x202);
    }

    #[test]
    fn stops_on_a_breakpoint() {
        let mut runner = runner_with(&[0x60, 0x01, 0x61, 0x02, 0x12, 0x04]);
        let breakpoints = HashSet::from([u12::new(0x204)]);

        let outcome = runner
            .update_with_breakpoints(1.0, Some(&breakpoints))
            .unwrap();
        assert!(matches!(outcome, RunnerOutcome::HitBreakpoint));
        assert_eq!(runner.machine().pc, 0x204);
    }

    #[test]
    fn halt_policy_surfaces_invalid_opcodes() {
        let mut runner = runner_with(&[0xFF, 0xFF]);
        assert!(matches!(
            runner.update(1.0),
            Err(MachineError::InvalidOpcode { opcode: 0xFFFF })
        ));
    }

    #[test]
    fn skip_policy_steps_over_invalid_opcodes() {
        let mut machine = Machine::new();
        machine.load(&[0xFF, 0xFF, 0x6A, 0x07, 0x12, 0x04]).unwrap();
        let config = RunnerConfig {
            invalid_opcode: InvalidOpcodePolicy::Skip,
            ..RunnerConfig::default()
        };
        let mut runner = Runner::with_config(machine, config);

        runner.update(0.1).unwrap();
        assert_eq!(runner.machine().v[0xA], 0x07);
    }

    #[test]
    fn custom_cpu_rate_is_honored() {
        // V0 += 1 forever at 10 Hz
        let mut machine = Machine::new();
        machine.load(&[0x70, 0x01, 0x12, 0x00]).unwrap();
        let config = RunnerConfig {
            cpu_hz: 10.0,
            ..RunnerConfig::default()
        };
        let mut runner = Runner::with_config(machine, config);

        runner.update(1.0).unwrap();
        // Roughly ten steps fit, alternating increment and jump
        assert_eq!(runner.machine().v[0], 5);
    }
}
