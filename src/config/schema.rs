//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control
//! plane. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Discovery listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Device registry access.
    pub registry: RegistryConfig,

    /// Reconcile loop settings.
    pub reconcile: ReconcileConfig,

    /// Node identities and the ordered discovery tags.
    pub discovery: DiscoveryConfig,

    /// Static Envoy resources (cluster, listener, route).
    pub envoy: EnvoyConfig,

    /// Active health check pushed to Envoy with the cluster.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:18000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Per-request timeout in seconds. Must exceed the long-poll hold.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:18000".to_string(),
            tls: None,
            request_timeout_secs: 60,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Tag registry (tailnet admin API) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the admin API.
    pub api_base_url: String,

    /// Tailnet name (e.g. "example.com").
    pub tailnet: String,

    /// Bearer token for the admin API.
    pub api_token: String,

    /// Upper bound on a single device fetch, in seconds.
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.tailscale.com".to_string(),
            tailnet: String::new(),
            api_token: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Reconcile loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Seconds between registry polls.
    pub poll_interval_secs: u64,

    /// Skip publishing when the computed assignment equals the last one.
    pub skip_unchanged: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            skip_unchanged: true,
        }
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Envoy node ids that receive the topology.
    pub node_ids: Vec<String>,

    /// Registry tags in the form `<label>-<weight>`, in output order.
    pub tags: Vec<String>,

    /// How long a request at the current version is held before a 304.
    /// 0 answers at once; a nonzero hold must stay below the proxy's
    /// `xds_request_timeout_secs`.
    pub hold_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            node_ids: vec!["envoy-node".to_string()],
            tags: Vec::new(),
            hold_timeout_secs: 0,
        }
    }
}

/// Static Envoy resource configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvoyConfig {
    /// Name of the single EDS cluster.
    pub cluster_name: String,

    /// Name of the HTTP listener.
    pub listener_name: String,

    /// Port the Envoy listener binds.
    pub listener_port: u16,

    /// Name of the route configuration (served over RDS).
    pub route_name: String,

    /// Port every discovered endpoint is reached on.
    pub endpoint_port: u16,

    /// Upstream connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Envoy-side cluster that points back at this control plane.
    pub xds_cluster_name: String,

    /// Seconds between the proxy's REST discovery polls.
    pub xds_refresh_delay_secs: u64,

    /// Proxy-side timeout for one REST discovery request.
    pub xds_request_timeout_secs: u64,
}

impl Default for EnvoyConfig {
    fn default() -> Self {
        Self {
            cluster_name: "envoy-cluster".to_string(),
            listener_name: "main-listener".to_string(),
            listener_port: 10000,
            route_name: "local-route".to_string(),
            endpoint_port: 8080,
            connect_timeout_secs: 1,
            xds_cluster_name: "xds_cluster".to_string(),
            xds_refresh_delay_secs: 1,
            xds_request_timeout_secs: 5,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Host header sent with each health check.
    pub host: String,

    /// Path requested by HTTP health checks.
    pub path: String,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 1,
            host: "127.0.0.1".to_string(),
            path: "/".to_string(),
            unhealthy_threshold: 2,
            healthy_threshold: 1,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes on the discovery listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
