use std::error;
use std::fmt;
use std::io;

/// Everything that can stop a CHIP-8 machine from loading or running.
#[derive(Debug)]
pub enum Chip8Error {
    /// the word at `pc` doesn't decode to any instruction
    InvalidOpcode { opcode: u16, pc: u16 },
    /// CALL with all 16 stack slots in use
    StackOverflow { pc: u16 },
    /// RET with nothing on the stack
    StackUnderflow { pc: u16 },
    /// program image doesn't fit between 0x200 and the top of RAM
    ProgramTooLarge { len: usize, capacity: usize },
    Io(io::Error),
}

impl fmt::Display for Chip8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chip8Error::InvalidOpcode { opcode, pc } => {
                write!(f, "invalid opcode 0x{:04X} at 0x{:03X}", opcode, pc)
            }
            Chip8Error::StackOverflow { pc } => {
                write!(f, "stack overflow: CALL at 0x{:03X} with 16 calls nested", pc)
            }
            Chip8Error::StackUnderflow { pc } => {
                write!(f, "stack underflow: RET at 0x{:03X} with an empty stack", pc)
            }
            Chip8Error::ProgramTooLarge { len, capacity } => write!(
                f,
                "program is {} bytes but only {} bytes are available",
                len, capacity
            ),
            Chip8Error::Io(err) => write!(f, "failed to read program: {}", err),
        }
    }
}

impl error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Chip8Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Chip8Error {
    fn from(err: io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
