//! CLI argument structures

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Run map-reduce jobs over text files
#[derive(Parser)]
#[command(name = "mapreduce")]
#[command(about = "mapreduce - Run map-reduce jobs over text files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count word occurrences across input files
    #[command(name = "wordcount")]
    WordCount {
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of worker threads (0 runs inline)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Pipeline config file (TOML)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Lines per map input slab
        #[arg(long, default_value_t = crate::slab::DEFAULT_SLAB_LINES)]
        slab_lines: usize,

        /// Lowercase words and strip surrounding punctuation
        #[arg(long)]
        normalize: bool,

        /// Only print the K most frequent words
        #[arg(long, value_name = "K")]
        top: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `word<TAB>count` line per word
    Text,
    /// A JSON object mapping words to counts
    Json,
}
