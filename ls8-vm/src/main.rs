use clap::{ArgAction, Parser};
use log::{LevelFilter, info};
use ls8::runtime::disasm;
use ls8::{Machine, Step, VmError, loader};
use simple_logger::SimpleLogger;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

const EXIT_HALT: i32 = 0;
const EXIT_LOAD: i32 = 1;
const EXIT_DECODE: i32 = 2;
const EXIT_USAGE: i32 = 64;
const EXIT_IO: i32 = 74;

#[derive(Parser)]
#[command(name = "ls8")]
#[command(about = "LS-8 emulator")]
struct Args {
    /// Program image, one binary byte per line
    program: PathBuf,

    /// Print a trace line to stderr before every instruction
    #[arg(short, long)]
    trace: bool,

    /// Disassemble the image to stderr before running it
    #[arg(short, long)]
    dump: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = SimpleLogger::new()
        .with_level(level)
        .env()
        .without_timestamps()
        .init()
    {
        eprintln!("ls8: logger unavailable: {}", e);
    }
}

fn exit(code: i32) -> ! {
    let _ = io::stdout().flush();
    process::exit(code)
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            exit(if e.use_stderr() { EXIT_USAGE } else { EXIT_HALT });
        }
    };

    init_logging(args.verbose);

    let image = match loader::load_file(&args.program) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(EXIT_LOAD);
        }
    };

    if args.dump {
        for line in disasm::disassemble(&image) {
            eprintln!("{}", line);
        }
    }

    let mut machine = Machine::new();
    if let Err(e) = machine.load(&image) {
        eprintln!("Error: {}", e);
        exit(EXIT_LOAD);
    }

    info!("running {} ({} bytes)", args.program.display(), image.len());

    loop {
        if args.trace {
            eprintln!("{}", machine.trace());
        }

        match machine.step() {
            Ok(Step::Continue) => {}
            Ok(Step::Halted) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                exit(exit_code(&e));
            }
        }
    }

    info!("halted after {} instructions", machine.cycles());
    exit(EXIT_HALT);
}

fn exit_code(e: &VmError) -> i32 {
    match e {
        e if e.is_decode() => EXIT_DECODE,
        VmError::Output(_) => EXIT_IO,
        _ => EXIT_LOAD,
    }
}
