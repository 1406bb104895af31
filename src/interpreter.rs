//! # interpreter
//!
//! The fetch/decode/execute engine. It holds no machine state of its own:
//! every operation takes the `MachineState` it works on, so one interpreter
//! can drive any number of machines.
//!
//! A step is:
//!  1. fetch the big-endian word at PC and advance PC by 2
//!  2. decode it purely from its bit fields (see `instruction`)
//!  3. apply exactly one instruction's effect
//!
//! Jumps and calls overwrite the advanced PC; skips add another 2 to it.
//! PC and every memory access stay within 12 bits.

use crate::error::Chip8Error;
use crate::framebuffer::{HEIGHT, WIDTH};
use crate::instruction::{Instruction, Opcode};
use crate::machine::{MachineState, STACK_DEPTH};
use crate::memory::{MemoryMap, ADDR_MASK};
use log::{debug, error, trace, warn};

/// What to do with a word that doesn't decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOpcodePolicy {
    /// log it and stop the machine
    Halt,
    /// log it and carry on with the next instruction
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub invalid_opcode: InvalidOpcodePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            invalid_opcode: InvalidOpcodePolicy::Halt,
        }
    }
}

/// The result of a single call to `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed(Instruction),
    /// an invalid opcode was tolerated; only PC moved
    Skipped(Opcode),
    /// suspended on `LD Vx, K` with no key press yet; nothing changed
    WaitingForKey,
    /// a key press ended a `LD Vx, K` suspension
    Resumed { key: u8 },
    /// the machine isn't running
    Halted,
}

#[derive(Debug, Clone, Default)]
pub struct Chip8Interpreter {
    config: Config,
}

impl Chip8Interpreter {
    pub fn new(config: Config) -> Self {
        Chip8Interpreter { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute one instruction, or make one attempt at finishing a key wait.
    ///
    /// Fatal conditions (stack violations, invalid opcodes under
    /// `InvalidOpcodePolicy::Halt`) clear `state.running` and are returned.
    pub fn step(&self, state: &mut MachineState) -> Result<Step, Chip8Error> {
        if !state.running {
            return Ok(Step::Halted);
        }

        if let Some(x) = state.waiting_for_key {
            return Ok(match state.keypad.take_press() {
                Some(key) => {
                    state.v[x as usize] = key;
                    state.waiting_for_key = None;
                    debug!("key 0x{:X} pressed, resuming at 0x{:03X}", key, state.pc);
                    Step::Resumed { key }
                }
                None => Step::WaitingForKey,
            });
        }

        let pc = state.pc;
        let op = Opcode(state.memory.get_word(pc));
        state.pc = pc.wrapping_add(2) & ADDR_MASK;

        let instruction = match Instruction::decode(op, pc) {
            Ok(instruction) => instruction,
            Err(err) => match self.config.invalid_opcode {
                InvalidOpcodePolicy::Skip => {
                    warn!("{}; skipping", err);
                    return Ok(Step::Skipped(op));
                }
                InvalidOpcodePolicy::Halt => return Err(halt(state, err)),
            },
        };

        trace!("0x{:03X}: {}  {}", pc, op, instruction);
        self.execute(state, instruction)?;
        Ok(Step::Executed(instruction))
    }

    /// Apply a single decoded instruction, assuming PC already points past it.
    ///
    /// A stack violation clears `state.running` and is returned.
    pub fn execute(
        &self,
        state: &mut MachineState,
        instruction: Instruction,
    ) -> Result<(), Chip8Error> {
        use Instruction::*;
        match instruction {
            Cls => {
                state.framebuffer.clear();
                state.draw_flag = true;
            }
            Ret => {
                if state.sp == 0 {
                    let pc = current_pc(state);
                    return Err(halt(state, Chip8Error::StackUnderflow { pc }));
                }
                state.sp -= 1;
                state.pc = state.stack[state.sp as usize];
            }
            Jump(nnn) => state.pc = nnn,
            Call(nnn) => {
                if state.sp as usize >= STACK_DEPTH {
                    let pc = current_pc(state);
                    return Err(halt(state, Chip8Error::StackOverflow { pc }));
                }
                state.stack[state.sp as usize] = state.pc;
                state.sp += 1;
                state.pc = nnn;
            }
            SkipEqByte { x, kk } => skip_if(&mut state.pc, state.v[x as usize] == kk),
            SkipNeByte { x, kk } => skip_if(&mut state.pc, state.v[x as usize] != kk),
            SkipEqReg { x, y } => {
                skip_if(&mut state.pc, state.v[x as usize] == state.v[y as usize])
            }
            LoadByte { x, kk } => state.v[x as usize] = kk,
            AddByte { x, kk } => {
                let vx = &mut state.v[x as usize];
                *vx = vx.wrapping_add(kk);
            }
            LoadReg { x, y } => state.v[x as usize] = state.v[y as usize],
            Or { x, y } => state.v[x as usize] |= state.v[y as usize],
            And { x, y } => state.v[x as usize] &= state.v[y as usize],
            Xor { x, y } => state.v[x as usize] ^= state.v[y as usize],
            // flag-setting arithmetic computes the result before touching VF,
            // then writes VF last so it wins when x or y is F
            AddReg { x, y } => {
                let (sum, carry) = state.v[x as usize].overflowing_add(state.v[y as usize]);
                state.v[x as usize] = sum;
                state.v[0xf] = carry as u8;
            }
            Sub { x, y } => {
                let (a, b) = (state.v[x as usize], state.v[y as usize]);
                state.v[x as usize] = a.wrapping_sub(b);
                state.v[0xf] = (a >= b) as u8;
            }
            Shr { x, .. } => {
                let vx = state.v[x as usize];
                state.v[x as usize] = vx >> 1;
                state.v[0xf] = vx & 0x01;
            }
            SubN { x, y } => {
                let (a, b) = (state.v[x as usize], state.v[y as usize]);
                state.v[x as usize] = b.wrapping_sub(a);
                state.v[0xf] = (b >= a) as u8;
            }
            Shl { x, .. } => {
                let vx = state.v[x as usize];
                state.v[x as usize] = vx << 1;
                state.v[0xf] = vx >> 7;
            }
            SkipNeReg { x, y } => {
                skip_if(&mut state.pc, state.v[x as usize] != state.v[y as usize])
            }
            LoadI(nnn) => state.i = nnn,
            JumpV0(nnn) => state.pc = nnn.wrapping_add(state.v[0] as u16) & ADDR_MASK,
            Random { x, kk } => {
                let byte = state.random_byte();
                state.v[x as usize] = byte & kk;
            }
            Draw { x, y, n } => draw(state, x, y, n),
            SkipKey { x } => {
                skip_if(&mut state.pc, state.keypad.is_pressed(state.v[x as usize]))
            }
            SkipNotKey { x } => {
                skip_if(&mut state.pc, !state.keypad.is_pressed(state.v[x as usize]))
            }
            LoadDelay { x } => state.v[x as usize] = state.delay_timer,
            WaitKey { x } => {
                // only a press that happens from now on counts
                state.keypad.clear_press();
                state.waiting_for_key = Some(x);
                debug!("waiting for a key press into V{:X}", x);
            }
            SetDelay { x } => state.delay_timer = state.v[x as usize],
            SetSound { x } => state.sound_timer = state.v[x as usize],
            AddI { x } => state.i = state.i.wrapping_add(state.v[x as usize] as u16),
            LoadFont { x } => state.i = state.memory.font_sprite_addr(state.v[x as usize]),
            StoreBcd { x } => {
                let vx = state.v[x as usize];
                let i = state.i;
                state.memory.write_byte(i, vx / 100);
                state.memory.write_byte(i.wrapping_add(1), (vx / 10) % 10);
                state.memory.write_byte(i.wrapping_add(2), vx % 10);
            }
            StoreRegs { x } => {
                for r in 0..=x {
                    let addr = state.i.wrapping_add(r as u16);
                    state.memory.write_byte(addr, state.v[r as usize]);
                }
            }
            LoadRegs { x } => {
                for r in 0..=x {
                    let addr = state.i.wrapping_add(r as u16);
                    state.v[r as usize] = state.memory.read_byte(addr);
                }
            }
        }
        Ok(())
    }

    /// One 60Hz timer tick. Both timers count down to zero and stay there.
    pub fn tick_timers(&self, state: &mut MachineState) {
        state.delay_timer = state.delay_timer.saturating_sub(1);
        state.sound_timer = state.sound_timer.saturating_sub(1);
    }
}

/// address of the instruction currently executing
fn current_pc(state: &MachineState) -> u16 {
    state.pc.wrapping_sub(2) & ADDR_MASK
}

fn skip_if(pc: &mut u16, cond: bool) {
    if cond {
        *pc = pc.wrapping_add(2) & ADDR_MASK;
    }
}

fn halt(state: &mut MachineState, err: Chip8Error) -> Chip8Error {
    error!("{}; halting", err);
    state.running = false;
    err
}

fn draw(state: &mut MachineState, x: u8, y: u8, n: u8) {
    let mut rows = [0u8; 15];
    for (offset, row) in rows.iter_mut().enumerate().take(n as usize) {
        *row = state.memory.read_byte(state.i.wrapping_add(offset as u16));
    }
    let col = state.v[x as usize] as usize % WIDTH;
    let line = state.v[y as usize] as usize % HEIGHT;
    let collision = state
        .framebuffer
        .draw_sprite(col, line, &rows[..n as usize]);
    state.v[0xf] = collision as u8;
    state.draw_flag = true;
}
