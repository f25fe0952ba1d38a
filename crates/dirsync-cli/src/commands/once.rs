//! Once command: a single sync cycle

use colored::{ColoredString, Colorize};
use dirsync_core::{
    ApplyAction, CycleReport, CycleState, DefaultHandler, SyncConfig, SyncOptions, run_cycle,
};

use crate::error::Result;

/// Run the once command
///
/// Restores the persisted snapshot if one is configured, runs one cycle and
/// prints the resulting actions.
pub fn run_once(config: &SyncConfig, dry_run: bool) -> Result<CycleReport> {
    println!(
        "{} Syncing {} -> {}",
        "=>".blue().bold(),
        config.source.display().to_string().yellow(),
        config.target.display().to_string().yellow()
    );

    let state = CycleState::restore(&config.persistence, &config.source);
    let (_, outcome) = run_cycle(config, state, &DefaultHandler, SyncOptions { dry_run });
    let report = outcome?;

    print_report(&report);
    Ok(report)
}

/// Same markers as the diff command: new, changed, deleted.
fn marker(action: &ApplyAction) -> ColoredString {
    match action {
        ApplyAction::Copied(_) => "+".green(),
        ApplyAction::Updated(_) => "~".yellow(),
        ApplyAction::Removed(_) => "-".red(),
    }
}

fn print_report(report: &CycleReport) {
    for (action, line) in report.apply.actions.iter().zip(report.apply.lines()) {
        println!("   {} {}", marker(action), line);
    }

    if report.apply.is_empty() {
        if report.baseline {
            println!(
                "{} Baseline recorded ({} files, tree {:016x}).",
                "OK".green().bold(),
                report.files,
                report.tree_hash
            );
        } else {
            println!("{} Already in sync.", "OK".green().bold());
        }
        return;
    }

    println!(
        "{} {} copied, {} updated, {} removed{}",
        "OK".green().bold(),
        report.apply.copied(),
        report.apply.updated(),
        report.apply.removed(),
        if report.apply.dry_run { " (dry run)" } else { "" }
    );
}
