//! Push-based metrics reporter for sigfuse
//!
//! Outputs one structured JSON snapshot per batch to stderr, next to the
//! logs, so stdout carries nothing but the exported decisions.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::application::engine::{BatchReport, BatchSummary};
use crate::domain::decision::Classification;
use crate::infrastructure::observability::metrics::Metrics;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub as_of: String,
    pub version: String,
    pub elapsed_ms: u128,
    pub batch: BatchSummary,
    pub totals: TotalsSnapshot,
}

/// Counters accumulated over the life of the process
#[derive(Debug, Serialize)]
pub struct TotalsSnapshot {
    pub decisions: BTreeMap<String, u64>,
    pub degraded: u64,
    pub failures: u64,
    pub evaluations: u64,
    pub mean_latency_ms: f64,
}

/// Push-based metrics reporter. Create it before the batch starts so
/// `elapsed_ms` covers the whole run.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    pub fn snapshot(&self, report: &BatchReport) -> MetricsSnapshot {
        let latency = &self.metrics.evaluation_latency_seconds;
        let evaluations = latency.get_sample_count();
        let mean_latency_ms = if evaluations > 0 {
            latency.get_sample_sum() / evaluations as f64 * 1_000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            as_of: report.as_of.to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            elapsed_ms: self.start_time.elapsed().as_millis(),
            batch: report.summary(),
            totals: TotalsSnapshot {
                decisions: Classification::ALL
                    .iter()
                    .map(|c| (c.to_string(), self.metrics.decisions_for(*c)))
                    .collect(),
                degraded: self.metrics.degraded_total.get(),
                failures: self.metrics.failures(),
                evaluations,
                mean_latency_ms,
            },
        }
    }

    /// Writes the snapshot as one `METRICS_JSON:` line.
    pub fn write_to<W: Write>(&self, report: &BatchReport, mut writer: W) -> Result<MetricsSnapshot> {
        let snapshot = self.snapshot(report);
        let json = serde_json::to_string(&snapshot).context("Failed to serialize metrics")?;
        // Use a special prefix so logs can be easily filtered
        writeln!(writer, "METRICS_JSON:{}", json).context("Failed to write metrics")?;
        writer.flush().context("Failed to flush metrics")?;
        Ok(snapshot)
    }

    /// Emits the snapshot line on stderr.
    pub fn emit(&self, report: &BatchReport) {
        let stderr = std::io::stderr();
        match self.write_to(report, stderr.lock()) {
            Ok(snapshot) => info!(
                "Batch: {} decisions | {} degraded | {} failed | {}ms",
                snapshot.batch.decisions,
                snapshot.batch.degraded,
                snapshot.batch.failures,
                snapshot.elapsed_ms
            ),
            Err(e) => warn!("{:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::SymbolOutcome;
    use crate::domain::errors::EngineError;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn failed_batch() -> BatchReport {
        BatchReport {
            as_of: Utc.with_ymd_and_hms(2025, 6, 2, 21, 0, 0).unwrap(),
            outcomes: vec![SymbolOutcome {
                symbol: "LABU".to_string(),
                result: Err(EngineError::NoPriceData {
                    symbol: "LABU".to_string(),
                }),
            }],
        }
    }

    #[test]
    fn test_snapshot_serializes_with_totals() {
        let metrics = Metrics::new().unwrap();
        let report = failed_batch();
        for (_, error) in report.failures() {
            metrics.record_failure(error);
        }

        let reporter = MetricsReporter::new(metrics);
        let snapshot = reporter.snapshot(&report);
        assert_eq!(snapshot.batch.failures, 1);
        assert_eq!(snapshot.totals.failures, 1);
        assert_eq!(snapshot.totals.decisions.len(), 5);
        assert_eq!(snapshot.totals.mean_latency_ms, 0.0);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"as_of\":\"2025-06-02T21:00:00+00:00\""));
    }

    #[test]
    fn test_write_to_emits_single_prefixed_line() {
        let reporter = MetricsReporter::new(Metrics::new().unwrap());
        let mut buffer = Vec::new();
        let snapshot = reporter.write_to(&failed_batch(), &mut buffer).unwrap();
        assert_eq!(snapshot.batch.failures, 1);

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.lines().count(), 1);
        let json = output
            .trim_end()
            .strip_prefix("METRICS_JSON:")
            .expect("prefixed line");
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["batch"]["failures"], 1);
    }

    #[test]
    fn test_elapsed_counts_from_reporter_creation() {
        let reporter = MetricsReporter::new(Metrics::new().unwrap());
        std::thread::sleep(Duration::from_millis(25));
        let snapshot = reporter.snapshot(&failed_batch());
        assert!(snapshot.elapsed_ms >= 25, "elapsed {}", snapshot.elapsed_ms);
    }
}
