//! Cycle driver: scan → diff → apply → persist, repeated on an interval
//!
//! State between cycles is an explicit [`CycleState`] value threaded through
//! [`run_cycle`], so a single cycle can be exercised in isolation. The
//! [`CycleDriver`] is a thin loop around it.
//!
//! Everything runs on the calling thread. A stop request is only honoured
//! between cycles; a cycle that has started always runs to completion.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use dirsync_fs::NormalizedPath;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::apply::{self, ApplyReport, DefaultHandler, SyncHandler, SyncOptions};
use crate::config::{BaselinePolicy, SyncConfig};
use crate::diff::{self, DiffResult};
use crate::persist::Persistence;
use crate::snapshot::Snapshot;

/// Granularity of the inter-cycle wait; bounds stop-request latency.
const STOP_POLL: Duration = Duration::from_millis(100);

/// State carried from one cycle to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleState {
    /// The snapshot the next scan is compared against
    pub previous: Option<Snapshot>,
}

impl CycleState {
    /// No previous snapshot; the baseline policy decides the first cycle.
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Start from a known snapshot.
    pub fn with_previous(snapshot: Snapshot) -> Self {
        Self {
            previous: Some(snapshot),
        }
    }

    /// Restore state from `persistence`.
    ///
    /// Never fails: an unreadable or malformed snapshot, or one taken from a
    /// different root, is reported as a warning and discarded so the baseline
    /// policy applies.
    pub fn restore(persistence: &Persistence, source: &Path) -> Self {
        match persistence.load() {
            Ok(Some(snapshot)) if same_root(snapshot.root(), source) => {
                info!(files = snapshot.len(), "resumed from persisted snapshot");
                Self::with_previous(snapshot)
            }
            Ok(Some(snapshot)) => {
                warn!(
                    persisted_root = %snapshot.root().display(),
                    source = %source.display(),
                    "persisted snapshot belongs to a different root, ignoring it"
                );
                Self::fresh()
            }
            Ok(None) => Self::fresh(),
            Err(e) => {
                warn!(error = %e, "falling back to baseline policy");
                Self::fresh()
            }
        }
    }
}

fn same_root(a: &Path, b: &Path) -> bool {
    NormalizedPath::new(a) == NormalizedPath::new(b)
}

/// What one cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// True when there was no previous snapshot and the baseline policy ran
    pub baseline: bool,
    /// Files in the new snapshot
    pub files: usize,
    /// Tree hash of the new snapshot
    pub tree_hash: u64,
    /// The computed diff
    pub diff: DiffResult,
    /// Actions performed
    pub apply: ApplyReport,
}

impl CycleReport {
    /// Whether the cycle found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.diff.is_empty()
    }
}

/// Run one scan → diff → apply → persist pass.
///
/// Returns the state for the next cycle together with the outcome:
///
/// - on a scan failure or a handler failure the incoming state is returned
///   unchanged, so the next cycle retries the same transition
/// - on a dry run the incoming state is returned unchanged
/// - otherwise the new snapshot is adopted; if persisting it fails the new
///   state is still returned (the target is already in sync) alongside the
///   error
pub fn run_cycle(
    config: &SyncConfig,
    state: CycleState,
    handler: &dyn SyncHandler,
    options: SyncOptions,
) -> (CycleState, Result<CycleReport>) {
    let current = match Snapshot::build(&config.source) {
        Ok(snapshot) => snapshot,
        Err(e) => return (state, Err(e)),
    };

    let (diff, baseline) = match &state.previous {
        Some(previous) => (diff::diff(previous, &current), false),
        None => match config.baseline {
            BaselinePolicy::Unchanged => (DiffResult::empty(), true),
            BaselinePolicy::AllNew => (DiffResult::all_new(&current), true),
        },
    };

    let apply = match apply::apply(&current, &config.target, &diff, handler, options) {
        Ok(report) => report,
        Err(e) => return (state, Err(e)),
    };

    let report = CycleReport {
        baseline,
        files: current.len(),
        tree_hash: current.tree_hash(),
        diff,
        apply,
    };

    if options.dry_run {
        return (state, Ok(report));
    }

    let needs_persist = state
        .previous
        .as_ref()
        .is_none_or(|previous| previous.has_changed(&current));

    let next = CycleState::with_previous(current);
    if needs_persist
        && let Some(snapshot) = &next.previous
        && let Err(e) = config.persistence.save(snapshot)
    {
        return (next, Err(e));
    }

    (next, Ok(report))
}

/// Totals from a [`CycleDriver::run`] loop
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Cycles started
    pub cycles: u64,
    /// Cycles that ended in an error
    pub failed: u64,
    /// State after the last cycle
    pub state: CycleState,
}

/// Repeatedly runs [`run_cycle`] until stopped.
pub struct CycleDriver {
    config: SyncConfig,
    handler: Box<dyn SyncHandler>,
    options: SyncOptions,
    max_cycles: Option<u64>,
}

impl CycleDriver {
    /// Driver using the [`DefaultHandler`].
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            handler: Box::new(DefaultHandler),
            options: SyncOptions::default(),
            max_cycles: None,
        }
    }

    /// Replace the handler.
    pub fn with_handler(mut self, handler: impl SyncHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Set apply options for every cycle.
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Stop after this many cycles.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Initial state, restored from the configured persistence.
    pub fn initial_state(&self) -> CycleState {
        CycleState::restore(&self.config.persistence, &self.config.source)
    }

    /// Run a single cycle from `state`.
    pub fn cycle(&self, state: CycleState) -> (CycleState, Result<CycleReport>) {
        run_cycle(&self.config, state, self.handler.as_ref(), self.options)
    }

    /// Loop until `stop` is set or `max_cycles` is reached.
    ///
    /// Cycle errors are logged and the loop carries on with the state the
    /// failed cycle returned.
    pub fn run(&self, stop: &AtomicBool) -> RunSummary {
        let mut summary = RunSummary {
            state: self.initial_state(),
            ..RunSummary::default()
        };

        info!(
            source = %self.config.source.display(),
            target = %self.config.target.display(),
            interval_ms = self.config.interval.as_millis() as u64,
            baseline = %self.config.baseline,
            "starting sync loop"
        );

        while !stop.load(Ordering::Relaxed) {
            let started = Instant::now();
            let state = std::mem::take(&mut summary.state);
            let (next, outcome) = self.cycle(state);
            summary.state = next;
            summary.cycles += 1;

            match outcome {
                Ok(report) if report.is_idle() && !report.baseline => {
                    debug!(cycle = summary.cycles, "no changes");
                }
                Ok(report) => {
                    info!(
                        cycle = summary.cycles,
                        baseline = report.baseline,
                        files = report.files,
                        copied = report.apply.copied(),
                        updated = report.apply.updated(),
                        removed = report.apply.removed(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "cycle complete"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(cycle = summary.cycles, error = %e, "cycle failed");
                }
            }

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            wait(self.config.interval, stop);
        }

        info!(cycles = summary.cycles, failed = summary.failed, "sync loop stopped");
        summary
    }
}

/// Sleep for `interval`, waking early if `stop` is set.
fn wait(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(STOP_POLL.min(deadline - now));
    }
}
