use clap::Parser;
use std::path::PathBuf;

#[derive(clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Csv,
    Json,
}

#[derive(Parser, Debug, Clone)]
pub struct Run {
    #[clap(short = 't', long = "trace", help = "path to the trace file")]
    pub trace: PathBuf,

    #[clap(
        short = 'c',
        long = "config",
        help = "hierarchy config yaml file (default: split 8 KiB L1 over 64 KiB L2)"
    )]
    pub config: Option<PathBuf>,

    #[clap(long = "format", value_enum, default_value_t = Format::Text, help = "output format")]
    pub format: Format,

    #[clap(long = "dump", help = "print the lines of every cache after the run")]
    pub dump: bool,

    #[clap(
        long = "flush",
        help = "write back dirty lines at the end of the run before reporting"
    )]
    pub flush: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct Sweep {
    #[clap(short = 't', long = "trace", help = "path to the trace file")]
    pub trace: PathBuf,

    #[clap(short = 'c', long = "config", help = "hierarchy config yaml file")]
    pub config: Option<PathBuf>,

    #[clap(short = 'l', long = "level", help = "name of the cache level to sweep")]
    pub level: String,

    #[clap(
        short = 'a',
        long = "associativity",
        value_delimiter = ',',
        default_value = "1,2,4,8",
        help = "associativities to simulate"
    )]
    pub associativity: Vec<usize>,

    #[clap(short = 'o', long = "output", help = "write csv rows to file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct Generate {
    #[clap(short = 'n', long = "count", help = "number of references to generate")]
    pub count: usize,

    #[clap(short = 's', long = "seed", help = "seed for a reproducible trace")]
    pub seed: Option<u64>,

    #[clap(short = 'o', long = "output", help = "write the trace to file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a trace through a cache hierarchy.
    Run(Run),
    /// Re-run a trace for a range of associativities of one level.
    Sweep(Sweep),
    /// Write a random trace.
    Generate(Generate),
}

#[derive(Parser, Debug, Clone)]
#[clap(
    version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
    about = "trace driven cache hierarchy simulator",
)]
pub struct Options {
    #[clap(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "increase log verbosity"
    )]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}
