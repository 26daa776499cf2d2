use super::machine::KeyWait;
use super::{
    AluOp, Machine, MachineError, Opcode, StepOutcome,
    font::{FONT_GLYPH_SIZE, FONT_START_ADDRESS},
};
use crate::u4;

impl Machine {
    /// Runs one already-decoded instruction. The program counter has been
    /// advanced past the instruction word by the caller.
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<StepOutcome, MachineError> {
        match opcode {
            Opcode::ClearScreen => {
                self.framebuffer.clear();
            }
            Opcode::Return => {
                self.pc = self.stack_pop()?;
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into());
            }
            Opcode::Call { nnn } => {
                self.stack_push(self.pc)?;
                self.pc = nnn;
            }
            Opcode::SkipEqImm { x, kk } => {
                if self.v[x] == kk {
                    self.skip_instruction();
                }
            }
            Opcode::SkipNeImm { x, kk } => {
                if self.v[x] != kk {
                    self.skip_instruction();
                }
            }
            Opcode::SkipEqReg { x, y } => {
                if self.v[x] == self.v[y] {
                    self.skip_instruction();
                }
            }
            Opcode::SkipNeReg { x, y } => {
                if self.v[x] != self.v[y] {
                    self.skip_instruction();
                }
            }
            Opcode::LoadImm { x, kk } => {
                self.v[x] = kk;
            }
            Opcode::AddImm { x, kk } => {
                self.v[x] = self.v[x].wrapping_add(kk);
            }
            Opcode::LoadIndex { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndex { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Opcode::Alu { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, kk } => {
                let byte: u8 = rand::random();
                self.v[x] = byte & kk;
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipKeyPressed { x } => {
                if self.keypad.is_pressed(u4::new(self.v[x] & 0x0F)) {
                    self.skip_instruction();
                }
            }
            Opcode::SkipKeyNotPressed { x } => {
                if !self.keypad.is_pressed(u4::new(self.v[x] & 0x0F)) {
                    self.skip_instruction();
                }
            }
            Opcode::WaitKey { x } => {
                // Move back onto this instruction; step() services the
                // wait from here on and advances once a press arrives
                self.pc = self.pc.wrapping_sub(2);
                self.key_wait = Some(KeyWait {
                    dest: x,
                    seen: self.keypad.snapshot(),
                });
                return Ok(StepOutcome::AwaitingKey);
            }
            Opcode::ReadDelay { x } => {
                self.v[x] = self.timers.delay;
            }
            Opcode::SetDelay { x } => {
                self.timers.delay = self.v[x];
            }
            Opcode::SetSound { x } => {
                self.timers.sound = self.v[x];
            }
            Opcode::FontGlyph { x } => {
                let digit = self.v[x] & 0x0F;
                self.i = FONT_START_ADDRESS + u16::from(digit) * FONT_GLYPH_SIZE;
            }
            Opcode::StoreBcd { x } => {
                let value = self.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                self.memory.write_block(self.i, &digits)?;
            }
            Opcode::StoreRegisters { x } => {
                let count = usize::from(x) + 1;
                self.memory.write_block(self.i, &self.v[..count])?;
                self.i = self.i.wrapping_add(count as u16);
            }
            Opcode::LoadRegisters { x } => {
                let count = usize::from(x) + 1;
                let block = self.memory.read_block(self.i, count)?;
                self.v[..count].copy_from_slice(block);
                self.i = self.i.wrapping_add(count as u16);
            }
            Opcode::Invalid(opcode) => {
                // step() rejects these before dispatch; kept for direct
                // callers of execute
                return Err(MachineError::InvalidOpcode { opcode });
            }
        };

        Ok(StepOutcome::Continue)
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: AluOp) {
        match op {
            AluOp::Copy => self.v[x] = self.v[y],
            AluOp::Or => {
                self.v[x] |= self.v[y];
                self.v[0xF] = 0;
            }
            AluOp::And => {
                self.v[x] &= self.v[y];
                self.v[0xF] = 0;
            }
            AluOp::Xor => {
                self.v[x] ^= self.v[y];
                self.v[0xF] = 0;
            }
            AluOp::Add => {
                let (result, carry) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = result;
                // Flag written last so VF as an operand still works
                self.v[0xF] = carry.into();
            }
            AluOp::Sub => {
                let (result, borrow) = self.v[x].overflowing_sub(self.v[y]);
                self.v[x] = result;
                // VF holds NOT borrow
                self.v[0xF] = (!borrow).into();
            }
            AluOp::SubFrom => {
                let (result, borrow) = self.v[y].overflowing_sub(self.v[x]);
                self.v[x] = result;
                self.v[0xF] = (!borrow).into();
            }
            AluOp::ShiftRight => {
                // Shifts read Vy, the original machine's behavior
                let low_bit = self.v[y] & 1;
                self.v[x] = self.v[y] >> 1;
                self.v[0xF] = low_bit;
            }
            AluOp::ShiftLeft => {
                let high_bit = self.v[y] >> 7;
                self.v[x] = self.v[y] << 1;
                self.v[0xF] = high_bit;
            }
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<StepOutcome, MachineError> {
        let sprite = self.memory.read_block(self.i, usize::from(n))?;
        let collision = self.framebuffer.draw(self.v[x], self.v[y], sprite);
        self.v[0xF] = collision.into();

        Ok(StepOutcome::FrameReady)
    }
}
