//! weighted-eds: a weighted endpoint discovery control plane for Envoy.
//!
//! # Architecture Overview
//!
//! ```text
//!   tailnet admin API                                     Envoy proxies
//!   (device registry)                                   (REST xDS clients)
//!          ▲                                                    │
//!          │ GET devices                  POST /v3/discovery:*  │
//!   ┌──────┴──────────────┐                        ┌────────────▼────────┐
//!   │  registry client    │                        │  http server        │
//!   └──────┬──────────────┘                        │  + admin API        │
//!          │ Vec<Device>                           └────────────┬────────┘
//!   ┌──────▼──────────────┐   publish   ┌──────────────────┐    │ get / subscribe
//!   │  reconciler         │────────────▶│  snapshot cache  │◀───┘
//!   │  (topology builder) │             │  (per node)      │
//!   └─────────────────────┘             └──────────────────┘
//! ```
//!
//! Startup is fail-fast: configuration, static resources, the initial
//! snapshot and the listener must all succeed before any proxy is served.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use weighted_eds::cache::SnapshotCache;
use weighted_eds::config::validation::validate_config;
use weighted_eds::config::watcher::ConfigWatcher;
use weighted_eds::config::{loader::read_config, ConfigError, ControlPlaneConfig};
use weighted_eds::http::{AppState, DiscoveryServer};
use weighted_eds::lifecycle::{wait_for_signal, Shutdown};
use weighted_eds::net::tls::load_tls_config;
use weighted_eds::observability::{logging, metrics};
use weighted_eds::reconciler::{Reconciler, ReconcilerSettings};
use weighted_eds::registry::RegistryClient;
use weighted_eds::topology::TopologyBuilder;
use weighted_eds::xds::DiscoveryService;

#[derive(Parser)]
#[command(name = "weighted-eds")]
#[command(version, about = "Weighted endpoint discovery control plane for Envoy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "WEIGHTED_EDS_CONFIG", default_value = "weighted-eds.toml")]
    config: PathBuf,

    /// Tailnet whose devices are discovered
    #[arg(long, env = "WEIGHTED_EDS_TAILNET")]
    tailnet: Option<String>,

    /// Admin API token for the tailnet
    #[arg(long, env = "WEIGHTED_EDS_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Discovery listener address
    #[arg(long, env = "WEIGHTED_EDS_BIND")]
    bind: Option<String>,

    /// Proxy node ids to publish snapshots for (comma-separated)
    #[arg(long, env = "WEIGHTED_EDS_NODE_IDS", value_delimiter = ',')]
    node_ids: Option<Vec<String>>,

    /// Discovery tags, in locality order (comma-separated)
    #[arg(long, env = "WEIGHTED_EDS_TAGS", value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Envoy cluster name
    #[arg(long, env = "WEIGHTED_EDS_CLUSTER_NAME")]
    cluster_name: Option<String>,

    /// Seconds between registry polls
    #[arg(long, env = "WEIGHTED_EDS_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Log level or filter directive
    #[arg(long, env = "WEIGHTED_EDS_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and exit
    Validate,
}

impl Cli {
    /// File values, then flags and environment on top.
    fn resolve_config(&self) -> Result<ControlPlaneConfig, ConfigError> {
        let mut config = if self.config.exists() {
            read_config(&self.config)?
        } else {
            ControlPlaneConfig::default()
        };

        if let Some(tailnet) = &self.tailnet {
            config.registry.tailnet = tailnet.clone();
        }
        if let Some(token) = &self.api_token {
            config.registry.api_token = token.clone();
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(node_ids) = &self.node_ids {
            config.discovery.node_ids = node_ids.clone();
        }
        if let Some(tags) = &self.tags {
            config.discovery.tags = tags.clone();
        }
        if let Some(cluster_name) = &self.cluster_name {
            config.envoy.cluster_name = cluster_name.clone();
        }
        if let Some(secs) = self.poll_interval {
            config.reconcile.poll_interval_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    if let Some(Commands::Validate) = cli.command {
        println!("Configuration is valid");
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("weighted-eds v{} starting", env!("CARGO_PKG_VERSION"));
    if !cli.config.exists() {
        tracing::warn!(path = %cli.config.display(), "Config file not found, using defaults and overrides");
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tailnet = %config.registry.tailnet,
        node_ids = ?config.discovery.node_ids,
        tags = ?config.discovery.tags,
        poll_interval_secs = config.reconcile.poll_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let builder = TopologyBuilder::new(config.envoy.clone(), config.health_check.clone());
    let statics = builder.build_static()?;
    let cache = Arc::new(SnapshotCache::new());
    let client = RegistryClient::new(&config.registry)?;
    tracing::info!(url = %client.devices_url(), "Registry client ready");

    let settings = ReconcilerSettings {
        node_ids: config.discovery.node_ids.clone(),
        tags: config.discovery.tags.clone(),
        poll_interval: Duration::from_secs(config.reconcile.poll_interval_secs),
        fetch_timeout: Duration::from_secs(config.registry.timeout_secs),
        skip_unchanged: config.reconcile.skip_unchanged,
    };
    let mut reconciler = Reconciler::new(client, builder, statics, cache.clone(), settings);

    // Held for the life of the process; dropping it stops the watch.
    let _watcher = match start_watcher(&cli.config, &config.discovery.tags, cli.tags.clone()) {
        Some((watcher, updates)) => {
            reconciler = reconciler.with_tag_updates(updates);
            Some(watcher)
        }
        None => None,
    };

    reconciler.publish_initial()?;
    let stats = reconciler.stats();

    let state = AppState {
        discovery: DiscoveryService::new(
            cache.clone(),
            Duration::from_secs(config.discovery.hold_timeout_secs),
        ),
        cache,
        reconciler: stats,
        admin: config.admin.clone(),
    };
    let server = DiscoveryServer::new(
        state,
        Duration::from_secs(config.listener.request_timeout_secs),
    );

    let shutdown = Shutdown::new();
    let mut server_task = match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            tokio::spawn(server.run_tls(addr, rustls, shutdown.subscribe()))
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tokio::spawn(server.run(listener, shutdown.subscribe()))
        }
    };
    let reconciler_task = tokio::spawn(reconciler.run(shutdown.subscribe()));

    let server_result = tokio::select! {
        _ = wait_for_signal() => None,
        result = &mut server_task => Some(result),
    };

    tracing::info!("Shutting down");
    shutdown.trigger();
    if let Err(e) = reconciler_task.await {
        tracing::error!(error = %e, "Reconciler task failed");
    }
    let server_result = match server_result {
        Some(result) => result,
        None => server_task.await,
    };
    server_result??;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn start_watcher(
    path: &Path,
    current_tags: &[String],
    tag_override: Option<Vec<String>>,
) -> Option<(notify::RecommendedWatcher, tokio::sync::mpsc::UnboundedReceiver<Vec<String>>)> {
    if !path.exists() {
        return None;
    }
    let (watcher, updates) = ConfigWatcher::new(path, current_tags.to_vec(), tag_override);
    match watcher.run() {
        Ok(watcher) => Some((watcher, updates)),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    }
}
