//! Weighted endpoint discovery control plane.
//!
//! Polls a tailnet device registry, groups tagged devices into weighted
//! localities and serves the result to Envoy over REST xDS.

pub mod admin;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod reconciler;
pub mod registry;
pub mod topology;
pub mod xds;

pub use cache::SnapshotCache;
pub use config::ControlPlaneConfig;
pub use http::DiscoveryServer;
pub use lifecycle::Shutdown;
pub use reconciler::Reconciler;
