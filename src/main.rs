use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tacc::Compilation;

/// Which listings to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tac,
    Asm,
    All,
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file, `-` reads from stdin.
    input: PathBuf,
    /// Listings to print.
    #[arg(long, value_enum, default_value_t = Emit::All)]
    emit: Emit,
    /// Write the listings to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Dump tokens, symbols and registers to stderr.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let source = read_source(&args.input)?;
    let compilation = tacc::compile(&source)?;
    if args.debug {
        dump(&compilation);
    }

    let rendered = render(&compilation, args.emit);
    match &args.output {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn read_source(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    fs::read_to_string(path)
}

fn render(compilation: &Compilation, emit: Emit) -> String {
    match emit {
        Emit::Tac => compilation.tac_listing(),
        Emit::Asm => compilation.asm_listing(),
        Emit::All => format!(
            "; three-address code\n{}\n; assembly\n{}",
            compilation.tac_listing(),
            compilation.asm_listing()
        ),
    }
}

fn dump(compilation: &Compilation) {
    let tokens = compilation
        .tokens()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    eprintln!("tokens: {}", tokens.join(" "));
    for symbol in compilation.symbols() {
        eprintln!("symbol: {symbol}");
    }
    eprint!("registers:\n{}", compilation.registers());
}
