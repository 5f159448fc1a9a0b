//! skillsync - sync AI coding assistant skills between platforms.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use skillsync::app::AppContext;
use skillsync::cli::Cli;
use skillsync::cli::output::robot_error;
use skillsync::sync::cancel_on_ctrl_c;
use skillsync::{Result, SkillSyncError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.robot {
                // Partial sync results were already printed as the one JSON document.
                if !matches!(e, SkillSyncError::SyncFailed { .. }) {
                    println!(
                        "{}",
                        serde_json::to_string(&robot_error(&e)).unwrap_or_default()
                    );
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_cli(cli)?;
    ctx.colors.apply();
    cancel_on_ctrl_c(ctx.cancel.clone())?;
    skillsync::cli::commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,skillsync=info",
        1 => "info,skillsync=debug",
        2 => "debug,skillsync=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
