//! Network layer.
//!
//! Plain TCP listeners come straight from `tokio::net`; this module only
//! prepares the optional TLS configuration for the discovery listener.

pub mod tls;
