use crate::framebuffer::Framebuffer;
use crate::memory::{Chip8MemoryMap, CHIP8_PROGRAM_ADDR};
use crate::Chip8Error;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;

/// how many nested calls the stack holds
pub const STACK_DEPTH: usize = 16;

/// The 16-key hex keypad.
///
/// Input sources set and clear the latches; the interpreter only reads them.
/// Besides the held state each key has, the keypad remembers the most recent
/// released-to-pressed transition so `LD Vx, K` can wait for a fresh press
/// rather than a key that was already down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; 16],
    last_press: Option<u8>,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: u8) {
        let k = (key & 0x0f) as usize;
        if !self.keys[k] {
            self.last_press = Some(k as u8);
        }
        self.keys[k] = true;
    }

    pub fn release(&mut self, key: u8) {
        self.keys[(key & 0x0f) as usize] = false;
    }

    pub fn release_all(&mut self) {
        self.keys = [false; 16];
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0x0f) as usize]
    }

    /// consume the latest key-press event, if any
    pub fn take_press(&mut self) -> Option<u8> {
        self.last_press.take()
    }

    /// forget any key-press event not yet consumed
    pub fn clear_press(&mut self) {
        self.last_press = None;
    }
}

/// All of the state of one CHIP-8 machine.
///
/// Nothing in here is global; any number of machines can run side by side.
/// The presenter reads `framebuffer` and acknowledges `draw_flag`, the input
/// source writes `keypad`, and the interpreter owns everything else.
pub struct MachineState {
    pub memory: Chip8MemoryMap,
    /// V0..VF; VF doubles as the flag register
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    /// index of the next free stack slot
    pub sp: u8,
    pub stack: [u16; STACK_DEPTH],
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub framebuffer: Framebuffer,
    /// set whenever the framebuffer changed; cleared by the presenter
    pub draw_flag: bool,
    pub keypad: Keypad,
    /// false ends the run
    pub running: bool,
    /// register to receive a key when suspended on `LD Vx, K`
    pub(crate) waiting_for_key: Option<u8>,
    rng: StdRng,
}

impl MachineState {
    /// fresh machine with its random source seeded from the OS
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// fresh machine with a reproducible random source
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        MachineState {
            memory: Chip8MemoryMap::new(),
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
            sp: 0,
            stack: [0; STACK_DEPTH],
            delay_timer: 0,
            sound_timer: 0,
            framebuffer: Framebuffer::new(),
            draw_flag: false,
            keypad: Keypad::new(),
            running: true,
            waiting_for_key: None,
            rng,
        }
    }

    /// load a program image at 0x200
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let len = self.memory.load_program(reader)?;
        debug!("loaded {} byte program at 0x{:03X}", len, self.memory.program_addr);
        Ok(len)
    }

    /// presenter acknowledgement: returns whether a redraw is due and clears it
    pub fn take_draw_flag(&mut self) -> bool {
        std::mem::replace(&mut self.draw_flag, false)
    }

    /// the host should be making a tone
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    /// suspended on `LD Vx, K`
    pub fn is_waiting_for_key(&self) -> bool {
        self.waiting_for_key.is_some()
    }

    pub(crate) fn random_byte(&mut self) -> u8 {
        self.rng.random::<u8>()
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}
