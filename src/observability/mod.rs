//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one span per transfer)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - No diagnostics are kept in process memory; everything is emitted
//! - Transfer ID flows through every log line of a transfer
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
