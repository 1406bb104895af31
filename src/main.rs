use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chip8_vm::display::MonoTermDisplay;
use chip8_vm::environment::{Environment, HostConfig};
use chip8_vm::input::StdinInput;
use chip8_vm::instruction::disassemble;
use chip8_vm::interpreter::{Chip8Interpreter, Config, InvalidOpcodePolicy};
use chip8_vm::machine::MachineState;
use chip8_vm::sound::{Mute, SimpleBeep, Sound};
use clap::{arg, command, value_parser, ArgAction};
use color_eyre::eyre::{eyre, Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?;

    let rom_arg = arg!(<rom> "The CHIP-8 program to run")
        .value_parser(value_parser!(PathBuf));
    let ips_arg = arg!(-i --ips <IPS> "How many instructions to execute per second")
        .value_parser(value_parser!(u32))
        .default_value("700");
    let timer_arg = arg!(--"timer-hz" <HZ> "How often the timers tick and the screen refreshes")
        .value_parser(value_parser!(u32))
        .default_value("60");
    let frames_arg = arg!(-f --frames <FRAMES> "Stop after this many frames")
        .value_parser(value_parser!(u64));
    let invalid_arg = arg!(--"on-invalid" <POLICY> "What to do with an opcode that doesn't decode")
        .value_parser(["halt", "skip"])
        .default_value("halt");
    let mute_arg = arg!(--mute "Don't beep").action(ArgAction::SetTrue);
    let disasm_arg =
        arg!(--disassemble "Print the program's instructions instead of running it")
            .action(ArgAction::SetTrue);
    let verbose_arg =
        arg!(-v --verbose "Log more to stderr; repeat for more").action(ArgAction::Count);

    let matches = command!()
        .arg(rom_arg)
        .arg(ips_arg)
        .arg(timer_arg)
        .arg(frames_arg)
        .arg(invalid_arg)
        .arg(mute_arg)
        .arg(disasm_arg)
        .arg(verbose_arg)
        .get_matches();

    let level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| eyre!("failed to set up logging: {}", e))?;

    let rom = matches
        .get_one::<PathBuf>("rom")
        .ok_or_else(|| eyre!("no program given"))?;
    let mut f = File::open(rom).wrap_err_with(|| format!("can't open {}", rom.display()))?;

    if matches.get_flag("disassemble") {
        let mut program = Vec::new();
        f.read_to_end(&mut program)?;
        for (addr, op, decoded) in disassemble(&program) {
            match decoded {
                Ok(instruction) => println!("0x{:03X}: {}  {}", addr, op, instruction),
                Err(_) => println!("0x{:03X}: {}  ???", addr, op),
            }
        }
        return Ok(());
    }

    let policy = match matches.get_one::<String>("on-invalid").map(String::as_str) {
        Some("skip") => InvalidOpcodePolicy::Skip,
        _ => InvalidOpcodePolicy::Halt,
    };
    let host = HostConfig {
        instructions_per_second: *matches.get_one::<u32>("ips").unwrap_or(&700),
        timer_hz: *matches.get_one::<u32>("timer-hz").unwrap_or(&60),
        ..HostConfig::default()
    };
    let max_frames = matches.get_one::<u64>("frames").copied();

    // load before touching the terminal so a bad program fails cleanly
    let mut state = MachineState::new();
    state
        .load_program(&mut f)
        .wrap_err_with(|| format!("can't load {}", rom.display()))?;

    let mut sound: Box<dyn Sound> = if matches.get_flag("mute") {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };
    let result = {
        let mut input = StdinInput::new(host.key_hold_frames)?;
        let mut display = MonoTermDisplay::new()?;
        let interpreter = Chip8Interpreter::new(Config {
            invalid_opcode: policy,
        });
        let mut env = Environment::new(
            interpreter,
            state,
            &mut display,
            &mut input,
            sound.as_mut(),
            host,
        );
        env.main_loop(max_frames)
    };

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..12 {
        println!();
    }
    result.map(|_| ())
}
