//! # environment
//!
//! Sets everything up and runs the main loop. The interpreter itself knows
//! nothing about wall-clock time, screens, keyboards or speakers; this is
//! where those meet it.
//!
//! Each frame (60 per second by default):
//!  * scan the input device into the keypad
//!  * run a frame's worth of instructions, giving up early if the machine
//!    stops or suspends on `LD Vx, K`
//!  * tick the timers once
//!  * start or stop the tone as the sound timer crosses zero
//!  * redraw if the framebuffer changed
//!  * sleep off whatever is left of the frame

use crate::display::Display;
use crate::input::Input;
use crate::interpreter::{Chip8Interpreter, Step};
use crate::machine::MachineState;
use crate::sound::Sound;
use color_eyre::eyre::{eyre, Result, WrapErr};
use log::info;
use std::time::{Duration, Instant};

/// host-side timing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    pub instructions_per_second: u32,
    /// timer and frame rate
    pub timer_hz: u32,
    /// how long a terminal key press stays down
    pub key_hold_frames: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            instructions_per_second: 700,
            timer_hz: 60,
            key_hold_frames: 6,
        }
    }
}

impl HostConfig {
    pub fn instructions_per_frame(&self) -> u32 {
        (self.instructions_per_second / self.timer_hz.max(1)).max(1)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.timer_hz.max(1) as f64)
    }
}

/// what happened during one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub instructions: u32,
    pub waiting_for_key: bool,
    pub redrawn: bool,
}

pub struct Environment<'a> {
    interpreter: Chip8Interpreter,
    state: MachineState,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    config: HostConfig,
}

impl<'a> Environment<'a> {
    pub fn new(
        interpreter: Chip8Interpreter,
        state: MachineState,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        config: HostConfig,
    ) -> Self {
        Environment {
            interpreter,
            state,
            display,
            input,
            sound,
            config,
        }
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    /// Run one frame. A fatal interpreter error ends the run and is returned.
    pub fn run_frame(&mut self) -> Result<Frame> {
        self.input
            .scan(&mut self.state.keypad)
            .wrap_err("failed to read input")?;
        if self.input.quit_requested() {
            self.state.running = false;
        }

        let mut frame = Frame {
            instructions: 0,
            waiting_for_key: false,
            redrawn: false,
        };
        for _ in 0..self.config.instructions_per_frame() {
            match self.interpreter.step(&mut self.state)? {
                Step::Halted => break,
                Step::WaitingForKey => {
                    frame.waiting_for_key = true;
                    break;
                }
                _ => frame.instructions += 1,
            }
        }

        // the tone covers every frame that starts with ST > 0
        let sounding = self.state.sound_active();
        self.interpreter.tick_timers(&mut self.state);

        if sounding && !self.sound.is_beeping() {
            self.sound.beep()?;
        } else if !sounding && self.sound.is_beeping() {
            self.sound.stop()?;
        }

        if self.state.take_draw_flag() {
            let data = self.state.framebuffer.as_bytes();
            let expected = self.display.get_display_size_bytes();
            if data.len() != expected {
                return Err(eyre!(
                    "display wants {} bytes per frame, framebuffer has {}",
                    expected,
                    data.len()
                ));
            }
            self.display.draw(data).wrap_err("failed to draw frame")?;
            frame.redrawn = true;
        }
        Ok(frame)
    }

    /// Run frames in real time until the machine stops, the user quits, or
    /// `max_frames` have gone by.
    pub fn main_loop(&mut self, max_frames: Option<u64>) -> Result<u64> {
        let frame_duration = self.config.frame_duration();
        info!(
            "running at {} instructions per frame, {} frames per second",
            self.config.instructions_per_frame(),
            self.config.timer_hz
        );

        let mut frames = 0;
        let result = loop {
            if !self.state.running || max_frames.map_or(false, |max| frames >= max) {
                break Ok(frames);
            }
            let started = Instant::now();
            if let Err(err) = self.run_frame() {
                break Err(err);
            }
            frames += 1;
            if let Some(rest) = frame_duration.checked_sub(started.elapsed()) {
                spin_sleep::sleep(rest);
            }
        };

        if self.sound.is_beeping() {
            self.sound.stop()?;
        }
        info!("stopped after {} frames at PC 0x{:03X}", frames, self.state.pc);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::interpreter::{Config, InvalidOpcodePolicy};
    use crate::sound::Mute;
    use crate::Chip8Error;

    fn machine(program: &[u8]) -> Result<MachineState> {
        let mut state = MachineState::with_seed(99);
        let mut prog = program;
        state.load_program(&mut prog)?;
        Ok(state)
    }

    fn adapters() -> (DummyDisplay, DummyInput, Mute) {
        (DummyDisplay::new(), DummyInput::new(&[]), Mute::new())
    }

    const FAST: HostConfig = HostConfig {
        instructions_per_second: 600,
        timer_hz: 60,
        key_hold_frames: 1,
    };

    #[test]
    fn test_instructions_per_frame() {
        assert_eq!(HostConfig::default().instructions_per_frame(), 11);
        assert_eq!(FAST.instructions_per_frame(), 10);
        let slow = HostConfig {
            instructions_per_second: 10,
            ..FAST
        };
        assert_eq!(slow.instructions_per_frame(), 1);
    }

    #[test]
    fn test_frame_draws_and_ticks() -> Result<()> {
        // LD V0, 3; LD ST, V0; LD F, V0; DRW V1, V1, 5; JP 0x208
        let state = machine(&[0x60, 0x03, 0xf0, 0x18, 0xf0, 0x29, 0xd1, 0x15, 0x12, 0x08])?;
        let (mut display, mut input, mut sound) = adapters();
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );

        let frame = env.run_frame()?;
        assert_eq!(frame.instructions, 10);
        assert!(frame.redrawn);
        assert_eq!(env.state().sound_timer, 2);
        assert!(!env.state().draw_flag);

        // nothing new drawn while spinning on the jump
        let frame = env.run_frame()?;
        assert!(!frame.redrawn);
        env.run_frame()?;
        assert_eq!(env.state().sound_timer, 0);
        assert!(env.sound.is_beeping());
        env.run_frame()?;
        drop(env);

        assert_eq!(display.frames_drawn, 1);
        assert_eq!(display.last_frame[0], 0xf0);
        assert!(!sound.is_beeping());
        Ok(())
    }

    #[test]
    fn test_sound_follows_timer() -> Result<()> {
        // LD V0, 2; LD ST, V0; JP 0x204
        let state = machine(&[0x60, 0x02, 0xf0, 0x18, 0x12, 0x04])?;
        let (mut display, mut input, mut sound) = adapters();
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );
        env.run_frame()?;
        assert!(env.sound.is_beeping());
        env.run_frame()?;
        assert!(env.sound.is_beeping());
        env.run_frame()?;
        assert!(!env.sound.is_beeping());
        Ok(())
    }

    #[test]
    fn test_shortest_tone_is_heard() -> Result<()> {
        // LD V0, 1; LD ST, V0; JP 0x204
        let state = machine(&[0x60, 0x01, 0xf0, 0x18, 0x12, 0x04])?;
        let (mut display, mut input, mut sound) = adapters();
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );
        env.run_frame()?;
        assert_eq!(env.state().sound_timer, 0);
        assert!(env.sound.is_beeping());
        env.run_frame()?;
        assert!(!env.sound.is_beeping());
        Ok(())
    }

    /// a display built for some other frame format
    struct HalfDisplay;

    impl Display for HalfDisplay {
        fn draw(&mut self, _data: &[u8]) -> std::io::Result<()> {
            Ok(())
        }
        fn get_display_size_bytes(&self) -> usize {
            128
        }
    }

    #[test]
    fn test_mismatched_display_is_refused() -> Result<()> {
        // CLS; JP 0x202
        let state = machine(&[0x00, 0xe0, 0x12, 0x02])?;
        let (_, mut input, mut sound) = adapters();
        let mut display = HalfDisplay;
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );
        assert!(env.run_frame().is_err());
        Ok(())
    }

    #[test]
    fn test_key_wait_ends_frame_early() -> Result<()> {
        // LD V2, K; JP 0x202
        let state = machine(&[0xf2, 0x0a, 0x12, 0x02])?;
        let (mut display, mut sound) = (DummyDisplay::new(), Mute::new());
        let mut input = DummyInput::new(&[&[], &[], &[0xc]]);
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );

        let frame = env.run_frame()?;
        assert!(frame.waiting_for_key);
        assert_eq!(frame.instructions, 1);
        let frame = env.run_frame()?;
        assert!(frame.waiting_for_key);
        assert_eq!(frame.instructions, 0);

        let frame = env.run_frame()?;
        assert!(!frame.waiting_for_key);
        assert_eq!(env.state().v[2], 0xc);
        Ok(())
    }

    #[test]
    fn test_fatal_error_ends_main_loop() -> Result<()> {
        let state = machine(&[0x00, 0xee])?;
        let (mut display, mut input, mut sound) = adapters();
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );
        let err = env.main_loop(Some(10)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Chip8Error>(),
            Some(Chip8Error::StackUnderflow { .. })
        ));
        assert!(!env.state().running);
        Ok(())
    }

    #[test]
    fn test_main_loop_stops_after_max_frames() -> Result<()> {
        // 0x200: invalid, then JP 0x202
        let state = machine(&[0xff, 0xff, 0x12, 0x02])?;
        let (mut display, mut input, mut sound) = adapters();
        let tolerant = Chip8Interpreter::new(Config {
            invalid_opcode: InvalidOpcodePolicy::Skip,
        });
        let config = HostConfig {
            timer_hz: 1000,
            ..FAST
        };
        let mut env =
            Environment::new(tolerant, state, &mut display, &mut input, &mut sound, config);
        assert_eq!(env.main_loop(Some(3))?, 3);
        assert!(env.state().running);
        Ok(())
    }

    #[test]
    fn test_main_loop_stops_when_halted() -> Result<()> {
        let mut state = machine(&[0x12, 0x00])?;
        state.running = false;
        let (mut display, mut input, mut sound) = adapters();
        let mut env = Environment::new(
            Chip8Interpreter::default(),
            state,
            &mut display,
            &mut input,
            &mut sound,
            FAST,
        );
        assert_eq!(env.main_loop(None)?, 0);
        Ok(())
    }
}
