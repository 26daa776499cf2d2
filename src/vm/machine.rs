use super::{Framebuffer, Keypad, MachineError, Memory, Opcode, StepOutcome, Timers};
use crate::u4;

pub(crate) const ROM_START_ADDRESS: u16 = 0x200;
/// Bytes available to a program image.
pub const ROM_CAPACITY: usize = super::memory::MEMORY_SIZE - ROM_START_ADDRESS as usize;
/// Deepest allowed subroutine nesting.
pub const STACK_DEPTH: usize = 16;

/// A pending Fx0A wait: the destination register and the key levels we
/// last compared against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct KeyWait {
    pub(crate) dest: u4,
    pub(crate) seen: [bool; 16],
}

/// Complete state of one CHIP-8 machine.
///
/// Plain data; create as many independent instances as needed. The host
/// drives it through [`Machine::step`] and [`Machine::tick_timers`] at its
/// own cadence (or lets [`super::Runner`] do the pacing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Machine {
    pub(crate) memory: Memory,
    pub(crate) framebuffer: Framebuffer,
    pub(crate) keypad: Keypad,
    pub(crate) timers: Timers,

    /// Program counter: address of the next instruction.
    pub(crate) pc: u16,
    /// Index register used by memory instructions.
    pub(crate) i: u16,
    /// General purpose registers V0-VF. VF doubles as the flag register.
    pub(crate) v: [u8; 16],
    /// Return addresses of active subroutine calls, at most [`STACK_DEPTH`].
    pub(crate) stack: Vec<u16>,

    pub(crate) key_wait: Option<KeyWait>,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            memory: Memory::new(),
            framebuffer: Framebuffer::new(),
            keypad: Keypad::new(),
            timers: Timers::new(),
            pc: ROM_START_ADDRESS,
            i: 0,
            v: [0; 16],
            stack: Vec::new(),
            key_wait: None,
        }
    }

    /// Restores the power-on state. Memory is cleared down to the font.
    pub fn reset(&mut self) {
        *self = Machine::new();
    }

    /// Resets the machine and copies `rom` to the program area.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), MachineError> {
        if rom.len() > ROM_CAPACITY {
            return Err(MachineError::RomTooLarge {
                size: rom.len(),
                capacity: ROM_CAPACITY,
            });
        }

        self.reset();
        self.memory.write_block(ROM_START_ADDRESS, rom)?;

        log::debug!("loaded {} byte rom", rom.len());
        Ok(())
    }

    /// Executes one fetch-decode-execute cycle.
    ///
    /// A pending key wait is serviced instead of fetching; the program
    /// counter stays on the waiting instruction until a fresh press shows
    /// up. An undecodable word is rejected before anything, the program
    /// counter included, changes.
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        if let Some(wait) = self.key_wait {
            return Ok(self.poll_key_wait(wait));
        }

        let word = self.fetch()?;

        match Opcode::decode(word) {
            Opcode::Invalid(opcode) => Err(MachineError::InvalidOpcode { opcode }),
            opcode => {
                self.pc = self.pc.wrapping_add(2);
                self.execute(opcode)
            }
        }
    }

    /// Updates the delay and sound timers. Call at 60 Hz.
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    /// True while the beep should play.
    pub fn sound_active(&self) -> bool {
        self.timers.sound_active()
    }

    /// Sets the level of one keypad key.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad.set(key, pressed);
    }

    /// State of a single display pixel (true = lit).
    pub fn pixel(&self, y: usize, x: usize) -> bool {
        self.framebuffer.pixel(y, x)
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    /// Return addresses of the active subroutine calls, innermost last.
    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    /// Moves the program counter past the current instruction word.
    pub fn skip_instruction(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn fetch(&self) -> Result<u16, MachineError> {
        let bytes = self.memory.read_block(self.pc, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn poll_key_wait(&mut self, wait: KeyWait) -> StepOutcome {
        match self.keypad.newly_pressed(&wait.seen) {
            Some(key) => {
                self.v[wait.dest] = key.value();
                self.key_wait = None;
                self.pc = self.pc.wrapping_add(2);
                StepOutcome::Continue
            }
            None => {
                // Refresh the reference levels so a release followed by a
                // new press still reads as an edge
                self.key_wait = Some(KeyWait {
                    seen: self.keypad.snapshot(),
                    ..wait
                });
                StepOutcome::AwaitingKey
            }
        }
    }

    pub(crate) fn stack_push(&mut self, addr: u16) -> Result<(), MachineError> {
        if self.stack.len() >= STACK_DEPTH {
            return Err(MachineError::StackOverflow);
        }
        self.stack.push(addr);
        Ok(())
    }

    pub(crate) fn stack_pop(&mut self) -> Result<u16, MachineError> {
        self.stack.pop().ok_or(MachineError::StackUnderflow)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::font::FONT_START_ADDRESS;
    use super::*;

    fn loaded(rom: &[u8]) -> Machine {
        let mut machine = Machine::new();
        machine.load(rom).unwrap();
        machine
    }

    #[test]
    fn load_places_the_rom_at_the_program_area() {
        let machine = loaded(&[0x12, 0x00]);
        assert_eq!(machine.pc, 0x200);
        assert_eq!(machine.memory.read(0x200).unwrap(), 0x12);
        assert_eq!(machine.memory.read(0x201).unwrap(), 0x00);
        // Font survives the load
        assert_eq!(machine.memory.read(FONT_START_ADDRESS).unwrap(), 0xF0);
    }

    #[test]
    fn load_rejects_oversized_roms() {
        let mut machine = Machine::new();
        assert!(machine.load(&vec![0; ROM_CAPACITY]).is_ok());
        assert!(matches!(
            machine.load(&vec![0; ROM_CAPACITY + 1]),
            Err(MachineError::RomTooLarge {
                size,
                capacity: ROM_CAPACITY,
            }) if size == ROM_CAPACITY + 1
        ));
    }

    #[test]
    fn reset_restores_power_on_state() {
        let mut machine = loaded(&[0x6A, 0xFF]);
        machine.step().unwrap();
        machine.set_key(u4::new(2), true);
        machine.timers.delay = 9;

        machine.reset();
        assert_eq!(machine.pc, 0x200);
        assert_eq!(machine.v, [0; 16]);
        assert_eq!(machine.memory.read(0x200).unwrap(), 0);
        assert!(!machine.keypad.is_pressed(u4::new(2)));
        assert_eq!(machine.timers.delay(), 0);
    }

    #[test]
    fn step_advances_past_a_plain_instruction() {
        let mut machine = loaded(&[0x6A, 0x02]);
        assert!(matches!(machine.step(), Ok(StepOutcome::Continue)));
        assert_eq!(machine.pc, 0x202);
        assert_eq!(machine.v[u4::new(0xA)], 0x02);
    }

    #[test]
    fn fetch_at_the_memory_edge_faults() {
        let mut machine = Machine::new();
        machine.pc = 4095;
        assert!(matches!(
            machine.step(),
            Err(MachineError::MemoryFault { address: 4096 })
        ));
        // The failed fetch moved nothing
        assert_eq!(machine.pc, 4095);
    }

    #[test]
    fn invalid_opcode_is_rejected_without_any_state_change() {
        let mut machine = loaded(&[0xFF, 0xFF]);
        let v_before = machine.v;

        assert!(matches!(
            machine.step(),
            Err(MachineError::InvalidOpcode { opcode: 0xFFFF })
        ));
        assert_eq!(machine.pc, 0x200);
        assert_eq!(machine.v, v_before);
        assert!(machine.stack.is_empty());
    }

    #[test]
    fn key_wait_freezes_the_pc_until_a_fresh_press() {
        // F50A: wait for a key into V5
        let mut machine = loaded(&[0xF5, 0x0A]);

        // A key held since before the wait began must not satisfy it
        machine.set_key(u4::new(3), true);
        assert!(matches!(machine.step(), Ok(StepOutcome::AwaitingKey)));
        assert_eq!(machine.pc, 0x200);
        assert!(matches!(machine.step(), Ok(StepOutcome::AwaitingKey)));
        assert_eq!(machine.pc, 0x200);

        machine.set_key(u4::new(0xB), true);
        assert!(matches!(machine.step(), Ok(StepOutcome::Continue)));
        assert_eq!(machine.v[u4::new(5)], 0xB);
        assert_eq!(machine.pc, 0x202);
    }

    #[test]
    fn key_wait_accepts_a_release_and_repress_of_the_same_key() {
        let mut machine = loaded(&[0xF0, 0x0A]);
        machine.set_key(u4::new(6), true);
        assert!(matches!(machine.step(), Ok(StepOutcome::AwaitingKey)));

        machine.set_key(u4::new(6), false);
        assert!(matches!(machine.step(), Ok(StepOutcome::AwaitingKey)));

        machine.set_key(u4::new(6), true);
        assert!(matches!(machine.step(), Ok(StepOutcome::Continue)));
        assert_eq!(machine.v[u4::new(0)], 6);
        assert_eq!(machine.pc, 0x202);
    }

    #[test]
    fn timers_run_while_a_key_wait_is_pending() {
        let mut machine = loaded(&[0xF1, 0x0A]);
        machine.timers.delay = 2;

        machine.step().unwrap();
        machine.tick_timers();
        machine.step().unwrap();
        machine.tick_timers();

        assert_eq!(machine.timers.delay(), 0);
        assert_eq!(machine.pc, 0x200);
    }

    #[test]
    fn call_and_return_round_trip() {
        // 0x200: CALL 0x204, 0x202: anything, 0x204: RET
        let mut machine = loaded(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE]);

        machine.step().unwrap();
        assert_eq!(machine.pc, 0x204);
        assert_eq!(machine.stack, vec![0x202]);

        machine.step().unwrap();
        assert_eq!(machine.pc, 0x202);
        assert!(machine.stack.is_empty());
    }

    #[test]
    fn sixteen_nested_calls_fit_and_the_seventeenth_overflows() {
        // CALL 0x200 forever: each step pushes one return address
        let mut machine = loaded(&[0x22, 0x00]);

        for depth in 1..=STACK_DEPTH {
            machine.step().unwrap();
            assert_eq!(machine.stack.len(), depth);
        }
        assert!(matches!(machine.step(), Err(MachineError::StackOverflow)));
        assert_eq!(machine.stack.len(), STACK_DEPTH);
    }

    #[test]
    fn return_on_an_empty_stack_underflows() {
        let mut machine = loaded(&[0x00, 0xEE]);
        assert!(matches!(machine.step(), Err(MachineError::StackUnderflow)));
    }
}
