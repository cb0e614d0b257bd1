use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .json program tree
    pub input: PathBuf,
    /// Output .asm file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print the loaded tree and stop
    #[arg(long)]
    pub ast_only: bool,
    /// Log each compilation phase to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
