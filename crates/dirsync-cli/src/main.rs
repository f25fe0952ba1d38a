//! dirsync CLI
//!
//! Mirrors a source directory into a target directory by polling for
//! content changes.

mod cli;
mod commands;
mod error;

use std::io;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} Polling directory sync", "dirsync".green().bold());
            println!();
            println!("Run {} for available commands.", "dirsync --help".cyan());
            Ok(())
        }
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// parseable; `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder()
        .with_target(verbose)
        .with_writer(io::stderr);

    let result = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    } else {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        tracing::subscriber::set_global_default(builder.with_max_level(level).finish())
    };
    result.expect("Failed to set tracing subscriber");

    tracing::debug!("Verbose mode enabled");
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Watch { sync, max_cycles } => {
            let config = commands::build_config(&sync)?;
            commands::run_watch(config, max_cycles)
        }
        Commands::Once { sync, dry_run } => {
            let config = commands::build_config(&sync)?;
            commands::run_once(&config, dry_run).map(|_| ())
        }
        Commands::Diff {
            source,
            state,
            json,
        } => commands::run_diff(&source, &state, json),
        Commands::Snapshot { source, out } => {
            commands::run_snapshot(&source, out.as_deref()).map(|_| ())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "dirsync", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }
}
