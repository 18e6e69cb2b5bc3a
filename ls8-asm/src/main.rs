use clap::{ArgAction, Parser as CParser};
use log::{LevelFilter, info};
use ls8::loader;
use ls8::runtime::disasm;
use ls8_asm::assemble_source;
use simple_logger::SimpleLogger;
use std::fs;
use std::path::PathBuf;

#[derive(CParser)]
#[command(name = "ls8as")]
#[command(about = "LS-8 assembler")]
struct Args {
    input: PathBuf,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat INPUT as a program image and print its disassembly
    #[arg(long)]
    disasm: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .env()
        .without_timestamps()
        .init()?;

    if args.disasm {
        let image = loader::load_file(&args.input)?;
        for line in disasm::disassemble(&image) {
            println!("{}", line);
        }
        return Ok(());
    }

    // Read input file
    let input = fs::read_to_string(&args.input)?;

    let root_path = args
        .input
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let image = assemble_source(&input, &root_path)?;

    // Write output file
    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension("ls8"));
    fs::write(&output_path, image.listing())?;

    info!("assembled {} bytes", image.bytes.len());
    println!("Assembled image written to {}", output_path.display());

    Ok(())
}
