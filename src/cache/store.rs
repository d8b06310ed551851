//! Per-node snapshot store.
//!
//! # Responsibilities
//! - Hold the latest snapshot for each node id
//! - Atomically replace it on publish, rejecting non-increasing versions
//! - Wake long-poll readers when a node's version changes
//!
//! # Design Decisions
//! - DashMap shards the node map; each entry is an `ArcSwapOption`, so reads
//!   never take a lock and never see a half-built snapshot
//! - Version checks use compare-and-swap, so concurrent publishers cannot
//!   move a node backwards
//! - Map guards are dropped before returning; nothing here is held across
//!   an `.await`
//! - Only publish creates an entry; readers and subscribers of an unknown
//!   node id leave the map untouched

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::watch;

use crate::cache::snapshot::Snapshot;
use crate::observability::metrics;

/// Errors returned by [`SnapshotCache::publish`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("snapshot version {offered} for node '{node}' is not newer than stored version {current}")]
    StaleVersion {
        node: String,
        offered: u64,
        current: u64,
    },
}

#[derive(Debug)]
struct CacheEntry {
    snapshot: ArcSwapOption<Snapshot>,
    /// Latest published version; 0 until the first publish.
    version_tx: watch::Sender<u64>,
}

impl CacheEntry {
    fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            snapshot: ArcSwapOption::empty(),
            version_tx,
        }
    }
}

/// Latest snapshot per node, shared between the reconciler and the
/// discovery handlers.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: DashMap<String, Arc<CacheEntry>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, node: &str) -> Arc<CacheEntry> {
        if let Some(entry) = self.entries.get(node) {
            return entry.value().clone();
        }
        self.entries
            .entry(node.to_string())
            .or_insert_with(|| Arc::new(CacheEntry::new()))
            .value()
            .clone()
    }

    /// The latest snapshot for `node`, if one has been published.
    pub fn get(&self, node: &str) -> Option<Arc<Snapshot>> {
        let entry = self.entries.get(node)?.value().clone();
        entry.snapshot.load_full()
    }

    /// Replace the snapshot for `node`.
    ///
    /// Fails if `snapshot` is not strictly newer than the stored one; the
    /// stored snapshot is left untouched in that case.
    pub fn publish(&self, node: &str, snapshot: Snapshot) -> Result<Arc<Snapshot>, CacheError> {
        let entry = self.entry(node);
        let next = Arc::new(snapshot);
        let offered = next.version();

        let mut current = entry.snapshot.load_full();
        loop {
            if let Some(existing) = &current {
                if existing.version() >= offered {
                    return Err(CacheError::StaleVersion {
                        node: node.to_string(),
                        offered,
                        current: existing.version(),
                    });
                }
            }

            let previous = entry.snapshot.compare_and_swap(&current, Some(next.clone()));
            let swapped = match (&*previous, &current) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if swapped {
                break;
            }
            current = arc_swap::Guard::into_inner(previous);
        }

        entry.version_tx.send_if_modified(|v| {
            if *v < offered {
                *v = offered;
                true
            } else {
                false
            }
        });
        metrics::record_snapshot_version(node, offered);
        tracing::debug!(node = %node, version = offered, "Snapshot published");
        Ok(next)
    }

    /// Watch the published version of `node`.
    ///
    /// Returns `None` until the first publish for `node`.
    pub fn subscribe(&self, node: &str) -> Option<watch::Receiver<u64>> {
        let entry = self.entries.get(node)?;
        Some(entry.value().version_tx.subscribe())
    }

    /// Node ids with a published snapshot, and their versions, sorted by id.
    pub fn nodes(&self) -> Vec<(String, u64)> {
        let mut nodes: Vec<_> = self
            .entries
            .iter()
            .filter_map(|e| {
                let version = e.value().snapshot.load_full().map(|s| s.version())?;
                Some((e.key().clone(), version))
            })
            .collect();
        nodes.sort();
        nodes
    }

    /// Number of nodes with a published snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
