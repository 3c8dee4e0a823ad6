//! Command-line interface definition.
//!
//! Kept in the library so `xtask` can render the man page from it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "adseq",
    version,
    about = "Ad-aware playback sequencer for linear streams",
    long_about = "Decides what plays next on a linear stream with inserted ad breaks.\n\n\
                  Scenarios describe content, ads and ad references; `adseq simulate` plays\n\
                  them through the sequencer and prints what the renderer was told to do."
)]
pub struct Cli {
    /// Log sequencing decisions (same as ADSEQ_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Play a scenario file through a simulated renderer
    Simulate {
        /// Scenario file (TOML)
        file: PathBuf,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
