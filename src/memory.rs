use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// the chip-8 only decodes 12 address lines, so everything wraps at 4K
pub const ADDR_MASK: u16 = 0x0fff;

/// Represents an addressable memory space
pub trait MemoryMap {
    /// read a byte; the address wraps at the top of memory
    fn read_byte(&self, addr: u16) -> u8 {
        self.get_ro_slice(0, self.size())[(addr & ADDR_MASK) as usize]
    }

    /// write a byte; the address wraps at the top of memory
    fn write_byte(&mut self, addr: u16, value: u8) {
        let size = self.size();
        self.get_rw_slice(0, size)[(addr & ADDR_MASK) as usize] = value;
    }

    /// get a big-endian two-byte word (an opcode)
    fn get_word(&self, addr: u16) -> u16 {
        let hi = self.read_byte(addr) as u16;
        let lo = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// write a chunk of bytes into "RAM", wrapping at the top of memory
    fn write(&mut self, data: &[u8], addr: u16) {
        for (offset, &byte) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as u16), byte);
        }
    }

    /// total number of addressable bytes
    fn size(&self) -> usize;

    /// get a r/w slice of the underlying memory (heap)
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory (heap)
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// Defines the CHIP-8 standard memory map (4K):
///   0x0000-0x004f  unused interpreter area
///   0x0050-0x009f  hex digit font
///   0x00a0-0x01ff  unused interpreter area
///   0x0200-0x0fff  program
///
/// the stack, registers and display live outside of addressable memory, so
/// programs get all of 0x200 upwards
#[derive(Clone)]
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
    pub font_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn size(&self) -> usize {
        self.bytes.len()
    }
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: u16 = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// bytes per font glyph
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

impl Chip8MemoryMap {
    /// zeroed memory with the font baked in
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES as usize].into_boxed_slice(),
            program_addr: CHIP8_PROGRAM_ADDR,
            font_addr: CHIP8_CONTEMPORARY_FONT_ADDR,
        };
        mm.write(&CHIP8_CONTEMPORARY_FONT, CHIP8_CONTEMPORARY_FONT_ADDR);
        mm
    }

    /// how many bytes a program may occupy
    pub fn program_capacity(&self) -> usize {
        self.size() - self.program_addr as usize
    }

    /// load a CHIP-8 program at 0x200
    ///
    /// the whole source is read before anything is written, so a failed load
    /// leaves memory exactly as it was
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let capacity = self.program_capacity();
        if buf.len() > capacity {
            return Err(Chip8Error::ProgramTooLarge {
                len: buf.len(),
                capacity,
            });
        }
        self.write(&buf, self.program_addr);
        Ok(buf.len())
    }

    /// address of the sprite for hex digit `digit`; only the low nibble counts
    pub fn font_sprite_addr(&self, digit: u8) -> u16 {
        self.font_addr + CHIP8_FONT_GLYPH_BYTES * (digit & 0x0f) as u16
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT_ADDR: u16 = 0x050;
const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
