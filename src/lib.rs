//! A CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * the machine is one owned value (`MachineState`); nothing is global, so
//!   any number of machines can run side by side
//! * the interpreter is a pure fetch/decode/execute engine over that state:
//!   decoding turns a word into an `Instruction` value, executing applies one
//!   instruction's effect, and neither knows about time or devices
//! * the display, keyboard and speaker sit behind traits so alternatives can
//!   be plugged in; the defaults render into the terminal with TUI, read keys
//!   with crossterm and beep the PC speaker
//! * the environment owns the wall clock: it runs a frame's worth of
//!   instructions, ticks the timers at 60Hz, then sleeps
//!
//! Model
//!
//! ```text
//! Environment
//!  |-- display, input, sound, host config
//!  |-- interpreter(config)
//!  |    |-- instruction set (decode)
//!  |    `-- execute(machine state)
//!  |-- machine state(memory, registers, stack, timers, framebuffer, keypad)
//!  `-- main loop
//!       |-- input.scan(keypad)
//!       |-- for n in instructions_per_frame { interpreter.step(state) }
//!       |      // stops early when halted or waiting for a key
//!       |-- interpreter.tick_timers(state)
//!       |-- sound.beep() / sound.stop() as ST crosses zero
//!       |-- display.draw(framebuffer) if the draw flag was set
//!       `-- sleep(rest of frame)
//! ```
//!
//! Errors: stack overflow/underflow always stop the machine; what happens on
//! an invalid opcode is up to `interpreter::Config`.
pub mod display;
pub mod environment;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod sound;

pub use error::Chip8Error;
