//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! every poll interval:
//!     DeviceSource::fetch_devices (bounded by registry.timeout_secs)
//!     → TopologyBuilder::build_assignment
//!     → Snapshot::new(next_version, ...)
//!     → SnapshotCache::publish for each node id
//! ```
//!
//! # Design Decisions
//! - Soft failure: a failed fetch or build logs and keeps the previous
//!   snapshot; only startup errors are fatal
//! - The version advances only on a successful publish
//! - Tag list updates arrive over a channel and apply from the next tick
//! - Shutdown abandons an in-flight tick; nothing is half-published since
//!   publishing never awaits

pub mod state;
pub mod task;

pub use state::{ReconcileState, ReconcilerStats, ReconcilerStatus, TickOutcome};
pub use task::{ReconcileError, Reconciler, ReconcilerSettings};
