use crate::error::Chip8Error;
use crate::memory::CHIP8_PROGRAM_ADDR;
use std::fmt;

/// A raw 16-bit instruction word, split into fields by position
///
/// | Field  | Bits            | Use                   |
/// |--------|-----------------|-----------------------|
/// | family | 15..12          | instruction group     |
/// | x      | 11..8           | register Vx           |
/// | y      | 7..4            | register Vy           |
/// | n      | 3..0            | nibble / sub-selector |
/// | kk     | 7..0            | immediate byte        |
/// | nnn    | 11..0           | address               |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn family(self) -> u8 {
        (self.0 >> 12) as u8
    }
    pub fn x(self) -> u8 {
        ((self.0 >> 8) & 0xf) as u8
    }
    pub fn y(self) -> u8 {
        ((self.0 >> 4) & 0xf) as u8
    }
    pub fn n(self) -> u8 {
        (self.0 & 0xf) as u8
    }
    pub fn kk(self) -> u8 {
        (self.0 & 0xff) as u8
    }
    pub fn nnn(self) -> u16 {
        self.0 & 0x0fff
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// One decoded CHIP-8 instruction. Register operands are indices 0..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1nnn
    Jump(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SkipEqByte { x: u8, kk: u8 },
    /// 4xkk
    SkipNeByte { x: u8, kk: u8 },
    /// 5xy0
    SkipEqReg { x: u8, y: u8 },
    /// 6xkk
    LoadByte { x: u8, kk: u8 },
    /// 7xkk
    AddByte { x: u8, kk: u8 },
    /// 8xy0
    LoadReg { x: u8, y: u8 },
    /// 8xy1
    Or { x: u8, y: u8 },
    /// 8xy2
    And { x: u8, y: u8 },
    /// 8xy3
    Xor { x: u8, y: u8 },
    /// 8xy4
    AddReg { x: u8, y: u8 },
    /// 8xy5
    Sub { x: u8, y: u8 },
    /// 8xy6
    Shr { x: u8, y: u8 },
    /// 8xy7
    SubN { x: u8, y: u8 },
    /// 8xyE
    Shl { x: u8, y: u8 },
    /// 9xy0
    SkipNeReg { x: u8, y: u8 },
    /// Annn
    LoadI(u16),
    /// Bnnn
    JumpV0(u16),
    /// Cxkk
    Random { x: u8, kk: u8 },
    /// Dxyn
    Draw { x: u8, y: u8, n: u8 },
    /// Ex9E
    SkipKey { x: u8 },
    /// ExA1
    SkipNotKey { x: u8 },
    /// Fx07
    LoadDelay { x: u8 },
    /// Fx0A
    WaitKey { x: u8 },
    /// Fx15
    SetDelay { x: u8 },
    /// Fx18
    SetSound { x: u8 },
    /// Fx1E
    AddI { x: u8 },
    /// Fx29
    LoadFont { x: u8 },
    /// Fx33
    StoreBcd { x: u8 },
    /// Fx55
    StoreRegs { x: u8 },
    /// Fx65
    LoadRegs { x: u8 },
}

impl Instruction {
    /// Decode an opcode by its fields alone. `pc` is only used to report
    /// where an unrecognized word came from.
    pub fn decode(op: Opcode, pc: u16) -> Result<Self, Chip8Error> {
        use Instruction::*;
        let (x, y, n, kk, nnn) = (op.x(), op.y(), op.n(), op.kk(), op.nnn());
        let instruction = match (op.family(), n) {
            (0x0, _) => match op.0 {
                0x00e0 => Cls,
                0x00ee => Ret,
                _ => return Err(invalid(op, pc)),
            },
            (0x1, _) => Jump(nnn),
            (0x2, _) => Call(nnn),
            (0x3, _) => SkipEqByte { x, kk },
            (0x4, _) => SkipNeByte { x, kk },
            (0x5, 0x0) => SkipEqReg { x, y },
            (0x6, _) => LoadByte { x, kk },
            (0x7, _) => AddByte { x, kk },
            (0x8, 0x0) => LoadReg { x, y },
            (0x8, 0x1) => Or { x, y },
            (0x8, 0x2) => And { x, y },
            (0x8, 0x3) => Xor { x, y },
            (0x8, 0x4) => AddReg { x, y },
            (0x8, 0x5) => Sub { x, y },
            (0x8, 0x6) => Shr { x, y },
            (0x8, 0x7) => SubN { x, y },
            (0x8, 0xe) => Shl { x, y },
            (0x9, 0x0) => SkipNeReg { x, y },
            (0xa, _) => LoadI(nnn),
            (0xb, _) => JumpV0(nnn),
            (0xc, _) => Random { x, kk },
            (0xd, _) => Draw { x, y, n },
            (0xe, _) => match kk {
                0x9e => SkipKey { x },
                0xa1 => SkipNotKey { x },
                _ => return Err(invalid(op, pc)),
            },
            (0xf, _) => match kk {
                0x07 => LoadDelay { x },
                0x0a => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1e => AddI { x },
                0x29 => LoadFont { x },
                0x33 => StoreBcd { x },
                0x55 => StoreRegs { x },
                0x65 => LoadRegs { x },
                _ => return Err(invalid(op, pc)),
            },
            _ => return Err(invalid(op, pc)),
        };
        Ok(instruction)
    }
}

fn invalid(op: Opcode, pc: u16) -> Chip8Error {
    Chip8Error::InvalidOpcode { opcode: op.0, pc }
}

impl TryFrom<u16> for Instruction {
    type Error = Chip8Error;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        Instruction::decode(Opcode(word), 0)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Cls => f.write_str("CLS"),
            Ret => f.write_str("RET"),
            Jump(nnn) => write!(f, "JP 0x{:03X}", nnn),
            Call(nnn) => write!(f, "CALL 0x{:03X}", nnn),
            SkipEqByte { x, kk } => write!(f, "SE V{:X}, 0x{:02X}", x, kk),
            SkipNeByte { x, kk } => write!(f, "SNE V{:X}, 0x{:02X}", x, kk),
            SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadByte { x, kk } => write!(f, "LD V{:X}, 0x{:02X}", x, kk),
            AddByte { x, kk } => write!(f, "ADD V{:X}, 0x{:02X}", x, kk),
            LoadReg { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            Shr { x, .. } => write!(f, "SHR V{:X}", x),
            SubN { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Shl { x, .. } => write!(f, "SHL V{:X}", x),
            SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadI(nnn) => write!(f, "LD I, 0x{:03X}", nnn),
            JumpV0(nnn) => write!(f, "JP V0, 0x{:03X}", nnn),
            Random { x, kk } => write!(f, "RND V{:X}, 0x{:02X}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKey { x } => write!(f, "SKP V{:X}", x),
            SkipNotKey { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddI { x } => write!(f, "ADD I, V{:X}", x),
            LoadFont { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegs { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegs { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

/// Walk a program image two bytes at a time as if it were loaded at 0x200.
/// A trailing odd byte is treated as the high half of a word.
pub fn disassemble(
    program: &[u8],
) -> impl Iterator<Item = (u16, Opcode, Result<Instruction, Chip8Error>)> + '_ {
    program.chunks(2).enumerate().map(|(idx, pair)| {
        let addr = CHIP8_PROGRAM_ADDR.wrapping_add((2 * idx) as u16);
        let word = ((pair[0] as u16) << 8) | pair.get(1).copied().unwrap_or(0) as u16;
        let op = Opcode(word);
        (addr, op, Instruction::decode(op, addr))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    fn decode(word: u16) -> Result<Instruction, Chip8Error> {
        Instruction::try_from(word)
    }

    #[test]
    fn test_opcode_fields() {
        let op = Opcode(0xd12f);
        assert_eq!(op.family(), 0xd);
        assert_eq!(op.x(), 0x1);
        assert_eq!(op.y(), 0x2);
        assert_eq!(op.n(), 0xf);
        assert_eq!(op.kk(), 0x2f);
        assert_eq!(op.nnn(), 0x12f);
    }

    #[test]
    fn test_decode_every_family() -> Result<(), Chip8Error> {
        let table = [
            (0x00e0, Cls),
            (0x00ee, Ret),
            (0x1234, Jump(0x234)),
            (0x2abc, Call(0xabc)),
            (0x3a42, SkipEqByte { x: 0xa, kk: 0x42 }),
            (0x4b42, SkipNeByte { x: 0xb, kk: 0x42 }),
            (0x5120, SkipEqReg { x: 1, y: 2 }),
            (0x6005, LoadByte { x: 0, kk: 5 }),
            (0x7003, AddByte { x: 0, kk: 3 }),
            (0x8120, LoadReg { x: 1, y: 2 }),
            (0x8121, Or { x: 1, y: 2 }),
            (0x8122, And { x: 1, y: 2 }),
            (0x8123, Xor { x: 1, y: 2 }),
            (0x8124, AddReg { x: 1, y: 2 }),
            (0x8125, Sub { x: 1, y: 2 }),
            (0x8126, Shr { x: 1, y: 2 }),
            (0x8127, SubN { x: 1, y: 2 }),
            (0x812e, Shl { x: 1, y: 2 }),
            (0x9120, SkipNeReg { x: 1, y: 2 }),
            (0xa123, LoadI(0x123)),
            (0xb123, JumpV0(0x123)),
            (0xc30f, Random { x: 3, kk: 0x0f }),
            (0xd125, Draw { x: 1, y: 2, n: 5 }),
            (0xe79e, SkipKey { x: 7 }),
            (0xe7a1, SkipNotKey { x: 7 }),
            (0xf307, LoadDelay { x: 3 }),
            (0xf30a, WaitKey { x: 3 }),
            (0xf315, SetDelay { x: 3 }),
            (0xf318, SetSound { x: 3 }),
            (0xf31e, AddI { x: 3 }),
            (0xf329, LoadFont { x: 3 }),
            (0xf333, StoreBcd { x: 3 }),
            (0xf355, StoreRegs { x: 3 }),
            (0xf365, LoadRegs { x: 3 }),
        ];
        for (word, expected) in table {
            assert_eq!(decode(word)?, expected, "decoding {:04X}", word);
        }
        Ok(())
    }

    #[test]
    fn test_register_f_is_an_ordinary_operand() -> Result<(), Chip8Error> {
        assert_eq!(decode(0x3fff)?, SkipEqByte { x: 0xf, kk: 0xff });
        assert_eq!(decode(0x8ef4)?, AddReg { x: 0xe, y: 0xf });
        assert_eq!(decode(0xdff1)?, Draw { x: 0xf, y: 0xf, n: 1 });
        Ok(())
    }

    #[test]
    fn test_reject_unknown_patterns() {
        for word in [
            0x0000, 0x0123, 0x00e1, 0x5121, 0x8128, 0x812f, 0x9121, 0xe100, 0xe19f, 0xf100,
            0xf1ff,
        ] {
            match decode(word) {
                Err(Chip8Error::InvalidOpcode { opcode, .. }) => assert_eq!(opcode, word),
                other => panic!("{:04X} decoded to {:?}", word, other),
            }
        }
    }

    #[test]
    fn test_invalid_reports_pc() {
        match Instruction::decode(Opcode(0xffff), 0x2a6) {
            Err(Chip8Error::InvalidOpcode { pc, .. }) => assert_eq!(pc, 0x2a6),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mnemonics() -> Result<(), Chip8Error> {
        assert_eq!(decode(0x6005)?.to_string(), "LD V0, 0x05");
        assert_eq!(decode(0xd125)?.to_string(), "DRW V1, V2, 5");
        assert_eq!(decode(0xf10a)?.to_string(), "LD V1, K");
        assert_eq!(decode(0xb2f0)?.to_string(), "JP V0, 0x2F0");
        assert_eq!(decode(0x8a0e)?.to_string(), "SHL VA");
        Ok(())
    }

    #[test]
    fn test_disassemble() {
        let listing: Vec<_> = disassemble(&[0x60, 0x05, 0x70, 0x03, 0xff, 0xff, 0x12]).collect();
        assert_eq!(listing.len(), 4);
        assert_eq!(listing[0].0, 0x200);
        assert_eq!(listing[1].1, Opcode(0x7003));
        assert!(matches!(listing[1].2, Ok(AddByte { x: 0, kk: 3 })));
        assert!(listing[2].2.is_err());
        assert_eq!(listing[3].0, 0x206);
        assert_eq!(listing[3].1, Opcode(0x1200));
    }
}
