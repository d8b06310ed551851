//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI flags / environment
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControlPlaneConfig (validated, immutable)
//!     → split into per-subsystem sections at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs re-reads the file
//!     → validation.rs checks the tag list
//!     → reconciler receives the new tags on its update channel
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the tag list hot-reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{
    AdminConfig, ControlPlaneConfig, DiscoveryConfig, EnvoyConfig, HealthCheckConfig,
    ListenerConfig, LogFormat, ObservabilityConfig, ReconcileConfig, RegistryConfig,
};
pub use validation::ValidationError;
