pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

pub use error::{CompileError, CompileResult};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    // 1. ── Load ───────────────────────────────────────────────────────
    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;
    let module = parser::load_from_json(&json).with_context(|| "Parsing program tree")?;

    if args.ast_only {
        println!("{}", parser::dump(&module)?);
        return Ok(());
    }

    // 2. ── Compile ────────────────────────────────────────────────────
    let source = args.input.display().to_string();
    let program = processor::run(&module, &source)
        .with_context(|| format!("Compiling {source}"))?;

    // 3. ── Write output ───────────────────────────────────────────────
    match &args.output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Creating {}", path.display()))?;
            writer::asm::emit(&program, &mut file)
                .with_context(|| format!("Writing {}", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            writer::asm::emit(&program, &mut stdout.lock()).with_context(|| "Writing assembly")?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries nothing but assembly. `RUST_LOG`
/// wins unless `--verbose` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
