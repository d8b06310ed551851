//! Configuration file watcher for hot reload of the discovery tag list.
//!
//! Only `discovery.tags` is reloadable. Static Envoy resources are built once
//! at startup and the rest of the file is ignored on reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::read_config;
use crate::config::validation::validate_tags;

/// A watcher that monitors the configuration file for tag list changes.
pub struct ConfigWatcher {
    reloader: TagReloader,
}

/// Turns file changes into tag list updates.
///
/// A tag list given on the command line or in the environment shadows the
/// file's list for the whole process lifetime, the same way it did at startup.
struct TagReloader {
    path: PathBuf,
    tag_override: Option<Vec<String>>,
    current: Vec<String>,
    update_tx: mpsc::UnboundedSender<Vec<String>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// `current_tags` is the list the reconciler started with. Returns the
    /// watcher and a receiver for tag list updates.
    pub fn new(
        path: &Path,
        current_tags: Vec<String>,
        tag_override: Option<Vec<String>>,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<String>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                reloader: TagReloader {
                    path: path.to_path_buf(),
                    tag_override,
                    current: current_tags,
                    update_tx,
                },
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for updates to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.reloader.path.clone();
        let mut reloader = self.reloader;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!("Config file change detected, reloading...");
                    reloader.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

impl TagReloader {
    /// Re-read the file and forward the effective tag list if it changed.
    fn reload(&mut self) {
        let tags = match &self.tag_override {
            Some(tags) => tags.clone(),
            None => match read_config(&self.path) {
                Ok(config) => config.discovery.tags,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload config, keeping current tags");
                    return;
                }
            },
        };

        if tags == self.current {
            tracing::debug!("Discovery tags unchanged");
            return;
        }
        // Truncate-then-write saves surface as an empty file first.
        if tags.is_empty() {
            tracing::warn!("Reloaded config has no discovery tags, keeping current tags");
            return;
        }
        let errors = validate_tags(&tags);
        if !errors.is_empty() {
            for e in &errors {
                tracing::error!(error = %e, "Rejected reloaded discovery tags");
            }
            return;
        }

        tracing::info!(tags = ?tags, "Discovery tags reloaded");
        if self.update_tx.send(tags.clone()).is_ok() {
            self.current = tags;
        }
    }
}
