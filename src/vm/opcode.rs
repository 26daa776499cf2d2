use crate::u4;

/// One decoded CHIP-8 instruction.
///
/// Every 16-bit word decodes to exactly one variant; encodings outside the
/// instruction set fold into `Invalid` carrying the raw word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    ClearScreen,
    Return,

    Jump { nnn: u16 },
    JumpOffset { nnn: u16 },
    Call { nnn: u16 },

    SkipEqImm { x: u4, kk: u8 },
    SkipNeImm { x: u4, kk: u8 },
    SkipEqReg { x: u4, y: u4 },
    SkipNeReg { x: u4, y: u4 },

    LoadImm { x: u4, kk: u8 },
    AddImm { x: u4, kk: u8 },
    LoadIndex { nnn: u16 },
    AddIndex { x: u4 },

    Alu { x: u4, y: u4, op: AluOp },
    Random { x: u4, kk: u8 },

    Draw { x: u4, y: u4, n: u4 },

    SkipKeyPressed { x: u4 },
    SkipKeyNotPressed { x: u4 },
    WaitKey { x: u4 },

    ReadDelay { x: u4 },
    SetDelay { x: u4 },
    SetSound { x: u4 },

    FontGlyph { x: u4 },
    StoreBcd { x: u4 },
    StoreRegisters { x: u4 },
    LoadRegisters { x: u4 },

    Invalid(u16),
}

/// Register-to-register operations of the 8xy_ family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Copy,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubFrom,
    ShiftLeft,
}

impl Opcode {
    /// Decodes a raw 16-bit word.
    pub fn decode(word: u16) -> Self {
        let nibble = (
            ((word & 0xF000) >> 12) as u8,
            ((word & 0x0F00) >> 8) as u8,
            ((word & 0x00F0) >> 4) as u8,
            (word & 0x000F) as u8,
        );

        let x = u4::new(nibble.1);
        let y = u4::new(nibble.2);
        let n = u4::new(nibble.3);
        let kk = (word & 0x00FF) as u8;
        let nnn = word & 0x0FFF;

        match nibble {
            (0x0, 0x0, 0xE, 0x0) => Opcode::ClearScreen,
            (0x0, 0x0, 0xE, 0xE) => Opcode::Return,
            (0x1, _, _, _) => Opcode::Jump { nnn },
            (0x2, _, _, _) => Opcode::Call { nnn },
            (0x3, _, _, _) => Opcode::SkipEqImm { x, kk },
            (0x4, _, _, _) => Opcode::SkipNeImm { x, kk },
            (0x5, _, _, 0x0) => Opcode::SkipEqReg { x, y },
            (0x6, _, _, _) => Opcode::LoadImm { x, kk },
            (0x7, _, _, _) => Opcode::AddImm { x, kk },
            (0x8, _, _, _) => {
                let op = match nibble.3 {
                    0x0 => AluOp::Copy,
                    0x1 => AluOp::Or,
                    0x2 => AluOp::And,
                    0x3 => AluOp::Xor,
                    0x4 => AluOp::Add,
                    0x5 => AluOp::Sub,
                    0x6 => AluOp::ShiftRight,
                    0x7 => AluOp::SubFrom,
                    0xE => AluOp::ShiftLeft,
                    _ => return Opcode::Invalid(word),
                };
                Opcode::Alu { x, y, op }
            }
            (0x9, _, _, 0x0) => Opcode::SkipNeReg { x, y },
            (0xA, _, _, _) => Opcode::LoadIndex { nnn },
            (0xB, _, _, _) => Opcode::JumpOffset { nnn },
            (0xC, _, _, _) => Opcode::Random { x, kk },
            (0xD, _, _, _) => Opcode::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Opcode::SkipKeyPressed { x },
            (0xE, _, 0xA, 0x1) => Opcode::SkipKeyNotPressed { x },
            (0xF, _, 0x0, 0x7) => Opcode::ReadDelay { x },
            (0xF, _, 0x0, 0xA) => Opcode::WaitKey { x },
            (0xF, _, 0x1, 0x5) => Opcode::SetDelay { x },
            (0xF, _, 0x1, 0x8) => Opcode::SetSound { x },
            (0xF, _, 0x1, 0xE) => Opcode::AddIndex { x },
            (0xF, _, 0x2, 0x9) => Opcode::FontGlyph { x },
            (0xF, _, 0x3, 0x3) => Opcode::StoreBcd { x },
            (0xF, _, 0x5, 0x5) => Opcode::StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => Opcode::LoadRegisters { x },

            _ => Opcode::Invalid(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_instruction_fields() {
        assert_eq!(Opcode::decode(0x00E0), Opcode::ClearScreen);
        assert_eq!(Opcode::decode(0x00EE), Opcode::Return);
        assert_eq!(Opcode::decode(0x1ABC), Opcode::Jump { nnn: 0xABC });
        assert_eq!(Opcode::decode(0x2345), Opcode::Call { nnn: 0x345 });
        assert_eq!(
            Opcode::decode(0x6A02),
            Opcode::LoadImm {
                x: u4::new(0xA),
                kk: 0x02
            }
        );
        assert_eq!(
            Opcode::decode(0xD125),
            Opcode::Draw {
                x: u4::new(1),
                y: u4::new(2),
                n: u4::new(5)
            }
        );
        assert_eq!(
            Opcode::decode(0xFA65),
            Opcode::LoadRegisters { x: u4::new(0xA) }
        );
    }

    #[test]
    fn decodes_the_alu_family_on_the_low_nibble() {
        assert_eq!(
            Opcode::decode(0x8AB4),
            Opcode::Alu {
                x: u4::new(0xA),
                y: u4::new(0xB),
                op: AluOp::Add
            }
        );
        assert_eq!(
            Opcode::decode(0x812E),
            Opcode::Alu {
                x: u4::new(1),
                y: u4::new(2),
                op: AluOp::ShiftLeft
            }
        );
        assert_eq!(Opcode::decode(0x8129), Opcode::Invalid(0x8129));
    }

    #[test]
    fn unassigned_encodings_decode_to_invalid() {
        // System call family is not supported
        assert_eq!(Opcode::decode(0x0123), Opcode::Invalid(0x0123));
        // Register skips require a zero low nibble
        assert_eq!(Opcode::decode(0x5AB1), Opcode::Invalid(0x5AB1));
        assert_eq!(Opcode::decode(0x9AB7), Opcode::Invalid(0x9AB7));
        // Key and misc families have sparse encodings
        assert_eq!(Opcode::decode(0xE19F), Opcode::Invalid(0xE19F));
        assert_eq!(Opcode::decode(0xF1FF), Opcode::Invalid(0xF1FF));
        assert_eq!(Opcode::decode(0xFFFF), Opcode::Invalid(0xFFFF));
    }
}
