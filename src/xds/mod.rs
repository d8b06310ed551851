//! xDS discovery protocol.
//!
//! # Data Flow
//! ```text
//! POST /v3/discovery:<type>  (DiscoveryRequest JSON)
//!     → service.rs check (node id, type_url, NACK logging)
//!     → SnapshotCache lookup for the node
//!     → version differs: DiscoveryResponse with the snapshot's resources
//!     → version current: wait on the node's version watch up to the hold window
//!     → still current: no update (HTTP 304)
//! ```

pub mod service;
pub mod types;

pub use service::{DiscoveryError, DiscoveryService};
pub use types::{DiscoveryRequest, DiscoveryResponse, ErrorDetail, Node};
