//! Topology subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     EnvoyConfig + HealthCheckConfig
//!     → builder.rs build_static (cluster, listener, route)
//!     → StaticResources, carried into every snapshot
//!
//! Reconcile tick:
//!     ordered discovery tags + Vec<Device>
//!     → weight.rs (tag → weight)
//!     → builder.rs build_assignment (one locality per populated tag)
//!     → EndpointAssignment
//!     → resources.rs (Envoy ClusterLoadAssignment)
//! ```

pub mod builder;
pub mod resources;
pub mod weight;

pub use builder::{EndpointAssignment, Locality, StaticResources, TopologyBuilder, TopologyError};
pub use resources::{Resource, ResourceType};
pub use weight::resolve_weight;
