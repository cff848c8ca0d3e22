//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pool, health monitor, dispatcher produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every dispatch record
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
