//! Watch command: run the sync loop until interrupted

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use colored::Colorize;
use dirsync_core::{CycleDriver, RunSummary, SyncConfig};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::error::Result;

/// Run the watch command
///
/// SIGINT and SIGTERM request a stop; the cycle in progress finishes first.
pub fn run_watch(config: SyncConfig, max_cycles: Option<u64>) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))?;
    }

    println!(
        "{} Watching {} -> {} every {} ms",
        "=>".blue().bold(),
        config.source.display().to_string().yellow(),
        config.target.display().to_string().yellow(),
        config.interval.as_millis()
    );

    let mut driver = CycleDriver::new(config);
    if let Some(max) = max_cycles {
        driver = driver.with_max_cycles(max);
    }
    let summary = driver.run(&stop);

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let files = summary
        .state
        .previous
        .as_ref()
        .map_or(0, |snapshot| snapshot.len());

    if summary.failed == 0 {
        println!(
            "{} Stopped after {} cycles ({} files tracked)",
            "OK".green().bold(),
            summary.cycles,
            files
        );
    } else {
        println!(
            "{} Stopped after {} cycles, {} failed ({} files tracked)",
            "WARN".yellow().bold(),
            summary.cycles,
            summary.failed,
            files
        );
    }
}
