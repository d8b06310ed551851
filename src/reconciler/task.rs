//! The poll → build → publish loop.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::cache::{CacheError, Snapshot, SnapshotCache, SnapshotError};
use crate::observability::metrics;
use crate::reconciler::state::{ReconcileState, ReconcilerStats, TickOutcome};
use crate::registry::{Device, DeviceSource, RegistryError};
use crate::topology::{EndpointAssignment, StaticResources, TopologyBuilder};

/// Errors that abort startup. Tick-time failures never surface as errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to build initial snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("failed to publish initial snapshot: {0}")]
    Cache(#[from] CacheError),
}

/// Runtime settings for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub node_ids: Vec<String>,
    pub tags: Vec<String>,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub skip_unchanged: bool,
}

/// Periodically rebuilds the endpoint assignment and publishes snapshots.
pub struct Reconciler<S> {
    source: S,
    builder: TopologyBuilder,
    statics: StaticResources,
    cache: Arc<SnapshotCache>,
    settings: ReconcilerSettings,
    next_version: u64,
    last_assignment: Option<EndpointAssignment>,
    stats: Arc<ReconcilerStats>,
    tag_updates: Option<mpsc::UnboundedReceiver<Vec<String>>>,
}

impl<S: DeviceSource> Reconciler<S> {
    pub fn new(
        source: S,
        builder: TopologyBuilder,
        statics: StaticResources,
        cache: Arc<SnapshotCache>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            source,
            builder,
            statics,
            cache,
            settings,
            next_version: 1,
            last_assignment: None,
            stats: Arc::new(ReconcilerStats::new()),
            tag_updates: None,
        }
    }

    /// Receive replacement tag lists (hot reload) between ticks.
    pub fn with_tag_updates(mut self, rx: mpsc::UnboundedReceiver<Vec<String>>) -> Self {
        self.tag_updates = Some(rx);
        self
    }

    pub fn stats(&self) -> Arc<ReconcilerStats> {
        self.stats.clone()
    }

    pub fn tags(&self) -> &[String] {
        &self.settings.tags
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        tracing::info!(old = ?self.settings.tags, new = ?tags, "Discovery tags updated");
        self.settings.tags = tags;
    }

    /// Publish an empty-assignment snapshot to every node.
    ///
    /// Lets proxies fetch clusters and listeners before the first poll
    /// completes. Any error here is fatal to startup.
    pub fn publish_initial(&mut self) -> Result<u64, ReconcileError> {
        let assignment = EndpointAssignment::empty(self.statics.cluster_name());
        let version = self.next_version;
        let snapshot = Snapshot::new(
            version,
            &self.statics,
            assignment.clone(),
            self.builder.endpoint_port(),
        )?;
        for node in &self.settings.node_ids {
            self.cache.publish(node, snapshot.clone())?;
        }

        self.next_version += 1;
        self.last_assignment = Some(assignment);
        self.stats.record_version(version);
        tracing::info!(version, nodes = self.settings.node_ids.len(), "Initial snapshot published");
        Ok(version)
    }

    async fn fetch(&self) -> Result<Vec<Device>, RegistryError> {
        let bound = self.settings.fetch_timeout;
        match time::timeout(bound, self.source.fetch_devices()).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout(bound.as_secs())),
        }
    }

    /// Run one reconcile cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = self.reconcile().await;
        self.stats.set_state(ReconcileState::Idle);
        self.stats.record(&outcome);
        metrics::record_reconcile(outcome.label());
        outcome
    }

    async fn reconcile(&mut self) -> TickOutcome {
        self.stats.set_state(ReconcileState::Fetching);
        let devices = match self.fetch().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching devices, keeping previous snapshot");
                return TickOutcome::FetchFailed;
            }
        };

        self.stats.set_state(ReconcileState::Building);
        let assignment = match self.builder.build_assignment(&self.settings.tags, &devices) {
            Ok(assignment) => assignment,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build endpoint assignment, skipping publish");
                return TickOutcome::BuildFailed;
            }
        };
        for locality in &assignment.localities {
            tracing::info!(
                tag = %locality.tag,
                addresses = locality.addresses.len(),
                weight = locality.weight,
                "Locality resolved"
            );
        }

        if self.settings.skip_unchanged && self.last_assignment.as_ref() == Some(&assignment) {
            tracing::debug!(devices = devices.len(), "Assignment unchanged, not publishing");
            return TickOutcome::Unchanged;
        }

        self.stats.set_state(ReconcileState::Publishing);
        let version = self.next_version;
        let localities = assignment.localities.len();
        let snapshot = match Snapshot::new(
            version,
            &self.statics,
            assignment.clone(),
            self.builder.endpoint_port(),
        ) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, version, "Failed to build snapshot, skipping publish");
                return TickOutcome::BuildFailed;
            }
        };

        for node in &self.settings.node_ids {
            if let Err(e) = self.cache.publish(node, snapshot.clone()) {
                tracing::error!(node = %node, error = %e, "Snapshot rejected by cache");
            }
        }

        self.next_version += 1;
        self.last_assignment = Some(assignment);
        metrics::record_localities(localities);
        tracing::info!(
            version,
            localities,
            endpoints = snapshot.assignment().endpoint_count(),
            "EDS updated"
        );
        TickOutcome::Published {
            version,
            localities,
        }
    }

    /// Drive ticks on the poll interval until shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            tags = ?self.settings.tags,
            nodes = ?self.settings.node_ids,
            "Reconciler starting"
        );

        let mut ticker = time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.tick() => {}
                        _ = shutdown.recv() => {
                            tracing::info!("Reconciler received shutdown signal mid-tick, abandoning it");
                            self.stats.set_state(ReconcileState::Idle);
                            break;
                        }
                    }
                }
                update = next_update(&mut self.tag_updates) => {
                    match update {
                        Some(tags) => self.set_tags(tags),
                        None => self.tag_updates = None,
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reconciler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

async fn next_update(rx: &mut Option<mpsc::UnboundedReceiver<Vec<String>>>) -> Option<Vec<String>> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
