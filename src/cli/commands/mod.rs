//! CLI command implementations
//!
//! Each subcommand has its own module with an Args struct and a `run()`
//! function.

use clap::Subcommand;

pub mod backup;
pub mod completions;
pub mod diff;
pub mod list;
pub mod sync;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync skills from one platform to another
    Sync(sync::SyncArgs),

    /// List discovered skills
    List(list::ListArgs),

    /// Show content differences between two platforms
    Diff(diff::DiffArgs),

    /// Manage backups
    Backup(backup::BackupArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Sync(args) => sync::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Diff(args) => diff::run(ctx, args),
        Commands::Backup(args) => backup::run(ctx, args),
        Commands::Completions(args) => completions::run(args),
    }
}
