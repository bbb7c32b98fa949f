//! CLI argument parsing for Trimmer

use crate::config::{DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_FILE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trimmer")]
#[command(version)]
#[command(
    about = "Trimmer, the Trello timer: hours each card spent in each monitored list",
    long_about = "Trimmer, the Trello timer.\n\n\
        Reads the monitored lists from the configuration file, fetches the move \
        history of every card in them and writes one line per card with the hours \
        spent in each list (NA for lists the card never visited)."
)]
pub struct Cli {
    /// Log verbose output (per-card moves and hours)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Enable trace-level debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Default log filter directive for the selected verbosity
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "trace"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
