//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry, reconciler, cache, discovery handlers
//!     → logging.rs (tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape on observability.metrics_address
//! ```

pub mod logging;
pub mod metrics;
