//! Command-line interface.

pub mod colors;
pub mod commands;
pub mod output;
pub mod resolver;

use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub use commands::Commands;

/// Keep AI coding assistant skills in sync across Claude Code, Cursor and Codex.
#[derive(Parser, Debug)]
#[command(name = "skillsync", version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $SKILLSYNC_HOME/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print a single JSON document on stdout
    #[arg(long, global = true)]
    pub robot: bool,

    #[command(subcommand)]
    pub command: Commands,
}
