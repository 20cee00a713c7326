//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, field style)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, EnvFilter)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Recording a metric without an installed exporter is a no-op, so
//!   library code and tests record unconditionally
//! - Request ID (`x-request-id`) is attached to every span by TraceLayer

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
