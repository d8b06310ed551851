//! Reconciler state machine and shared counters.
//!
//! # States
//! ```text
//! Idle → Fetching → Building → Publishing → Idle
//!          │            │
//!          └────────────┴──→ Idle   (fetch or build failure, nothing published)
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;

/// Where the reconciler is within a tick.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileState {
    Idle = 0,
    Fetching = 1,
    Building = 2,
    Publishing = 3,
}

impl From<u8> for ReconcileState {
    fn from(val: u8) -> Self {
        match val {
            1 => ReconcileState::Fetching,
            2 => ReconcileState::Building,
            3 => ReconcileState::Publishing,
            _ => ReconcileState::Idle,
        }
    }
}

/// Result of a single reconcile tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TickOutcome {
    /// A new snapshot was published to every node.
    Published { version: u64, localities: usize },
    /// The assignment matched the last published one; nothing was published.
    Unchanged,
    /// The registry could not be read; the previous snapshot stays.
    FetchFailed,
    /// The topology or snapshot could not be built; the previous snapshot stays.
    BuildFailed,
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::Published { .. } => "published",
            TickOutcome::Unchanged => "unchanged",
            TickOutcome::FetchFailed => "fetch_failed",
            TickOutcome::BuildFailed => "build_failed",
        }
    }
}

/// Counters shared with the admin API. Updated only by the reconciler task.
#[derive(Debug, Default)]
pub struct ReconcilerStats {
    state: AtomicU8,
    ticks: AtomicU64,
    published: AtomicU64,
    unchanged: AtomicU64,
    fetch_failures: AtomicU64,
    build_failures: AtomicU64,
    version: AtomicU64,
    last_outcome: ArcSwapOption<TickOutcome>,
}

impl ReconcilerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReconcileState {
        ReconcileState::from(self.state.load(Ordering::Relaxed))
    }

    pub(crate) fn set_state(&self, state: ReconcileState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    pub(crate) fn record_version(&self, version: u64) {
        self.version.store(version, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, outcome: &TickOutcome) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            TickOutcome::Published { version, .. } => {
                self.version.store(*version, Ordering::Relaxed);
                &self.published
            }
            TickOutcome::Unchanged => &self.unchanged,
            TickOutcome::FetchFailed => &self.fetch_failures,
            TickOutcome::BuildFailed => &self.build_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.last_outcome.store(Some(Arc::new(*outcome)));
    }

    /// Point-in-time copy for reporting.
    pub fn status(&self) -> ReconcilerStatus {
        ReconcilerStatus {
            state: self.state(),
            ticks: self.ticks.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            version: self.version.load(Ordering::Relaxed),
            last_outcome: self.last_outcome.load_full().map(|o| *o),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcilerStatus {
    pub state: ReconcileState,
    pub ticks: u64,
    pub published: u64,
    pub unchanged: u64,
    pub fetch_failures: u64,
    pub build_failures: u64,
    /// Latest version published by the reconciler.
    pub version: u64,
    pub last_outcome: Option<TickOutcome>,
}
