//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum, TraceLayer, TimeoutLayer)
//!     → /v3/discovery:<type> → xds::DiscoveryService
//!     → /admin/*             → admin (bearer auth)
//! ```

pub mod server;

pub use server::{AppState, DiscoveryServer};
