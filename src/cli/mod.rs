//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// dbcsync - schema-driven DBC <-> SQL converter
#[derive(Parser, Debug)]
#[command(name = "dbcsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ./config.json)
    #[arg(short, long, global = true, env = "DBCSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a config template to edit
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Read a DBC file and print a sample record
    Read {
        /// DBC file name (without extension)
        #[arg(short, long)]
        name: String,

        /// Sample record index to display
        #[arg(short, long, default_value = "0")]
        record: usize,

        /// Rebuild and write the DBC to the export directory
        #[arg(short, long)]
        out: bool,
    },

    /// Print header info of a DBC file
    Header {
        /// DBC file name (without extension)
        #[arg(short, long)]
        name: String,
    },

    /// Import DBC files into the database
    Import {
        /// Single DBC file name; all meta documents when omitted
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Export database tables back to DBC files
    Export {
        /// Single DBC file name; all meta documents when omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Export even if versioning says the table is unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
