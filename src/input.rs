use crate::machine::Keypad;
use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use log::{debug, warn};
use std::collections::HashMap;
use std::io;
use std::time::Duration;

/// the COSMAC hex keypad laid over the left-hand side of a qwerty keyboard
///
///   1 2 3 C        1 2 3 4
///   4 5 6 D   <=   q w e r
///   7 8 9 E        a s d f
///   A 0 B F        z x c v
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// Feeds key latches. Called once per frame by the host loop.
pub trait Input {
    /// bring the keypad up to date with the device
    fn scan(&mut self, keypad: &mut Keypad) -> Result<(), io::Error>;

    /// the user asked to stop the machine
    fn quit_requested(&self) -> bool;
}

/// Keyboard input from a raw-mode terminal, using crossterm.
///
/// Terminals only report key presses (and autorepeat), never releases, so a
/// pressed key is held down for `hold_frames` scans after its last press.
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    /// frames left before each key is released
    held: [u32; 16],
    hold_frames: u32,
    quit: bool,
}

impl StdinInput {
    pub fn new(hold_frames: u32) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(Self::with_hold_frames(hold_frames))
    }

    /// a key is always held for at least the frame it was pressed in
    fn with_hold_frames(hold_frames: u32) -> Self {
        StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: [0; 16],
            hold_frames: hold_frames.max(1),
            quit: false,
        }
    }

    /// release keys whose hold has run out
    fn age_keys(&mut self, keypad: &mut Keypad) {
        for (key, frames) in self.held.iter_mut().enumerate() {
            if *frames > 0 {
                *frames -= 1;
                if *frames == 0 {
                    keypad.release(key as u8);
                }
            }
        }
    }

    fn on_key(&mut self, code: KeyCode, keypad: &mut Keypad) {
        match code {
            KeyCode::Esc => {
                debug!("escape pressed, quitting");
                self.quit = true;
            }
            KeyCode::Char(c) => match self.keymap.get(&c.to_ascii_lowercase()) {
                Some(&key) => {
                    keypad.press(key);
                    self.held[key as usize] = self.hold_frames;
                }
                None => warn!("can't map {:?} to a COSMAC key", c),
            },
            other => debug!("ignoring key {:?}", other),
        }
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn scan(&mut self, keypad: &mut Keypad) -> Result<(), io::Error> {
        // age out keys from earlier frames first, so a repeat this frame
        // keeps its key down
        self.age_keys(keypad);
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                self.on_key(evt.code, keypad);
            }
        }
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// Scripted input for testing: each scan presses the next batch of keys
/// and releases the previous one.
pub struct DummyInput {
    script: Vec<Vec<u8>>,
    frame: usize,
}

impl DummyInput {
    pub fn new(script: &[&[u8]]) -> Self {
        DummyInput {
            script: script.iter().map(|keys| keys.to_vec()).collect(),
            frame: 0,
        }
    }
}

impl Input for DummyInput {
    fn scan(&mut self, keypad: &mut Keypad) -> Result<(), io::Error> {
        keypad.release_all();
        if let Some(keys) = self.script.get(self.frame) {
            for &key in keys {
                keypad.press(key);
            }
        }
        self.frame += 1;
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        false
    }
}
