//! Snapshot cache subsystem.
//!
//! # Data Flow
//! ```text
//! Reconciler (single writer):
//!     StaticResources + EndpointAssignment
//!     → snapshot.rs (validate, freeze into Snapshot)
//!     → store.rs publish (CAS replace, bump version watch)
//!
//! Discovery handlers (many readers):
//!     → store.rs get (lock-free load of Arc<Snapshot>)
//!     → store.rs subscribe (await a newer version)
//! ```
//!
//! # Design Decisions
//! - Only the latest snapshot per node is kept; there is no history
//! - Snapshots are shared as `Arc<Snapshot>` and never mutated

pub mod snapshot;
pub mod store;

pub use snapshot::{Snapshot, SnapshotError};
pub use store::{CacheError, SnapshotCache};
