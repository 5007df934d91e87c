//! Push-based observability for sigfuse
//!
//! Metrics are only ever pushed out, as a structured JSON snapshot on stdout
//! or in Prometheus text format. Nothing listens for requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::{MetricsReporter, MetricsSnapshot};
