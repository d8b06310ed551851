//! Device registry subsystem.
//!
//! # Data Flow
//! ```text
//! Reconcile tick
//!     → client.rs (GET devices, bearer token, bounded timeout)
//!     → types.rs (decode JSON, parse addresses into IpAddr)
//!     → Vec<Device> handed to the topology builder
//! ```
//!
//! # Design Decisions
//! - Untyped registry data is validated here, never downstream
//! - Any failure (status, timeout, bad body) is one error value; the
//!   reconciler treats all of them as transient

pub mod client;
pub mod types;

pub use client::{DeviceSource, RegistryClient};
pub use types::{Device, RegistryError, RegistryResult};
