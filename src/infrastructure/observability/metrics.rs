//! Prometheus metrics definitions for sigfuse
//!
//! All metrics use the `sigfuse_` prefix and are read-only.

use crate::domain::decision::{Classification, Decision};
use crate::domain::errors::EngineError;
use prometheus::{
    CounterVec, Histogram, HistogramOpts, HistogramTimer, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the decision engine
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Decisions produced, by classification
    pub decisions_total: CounterVec,
    /// Decisions produced from incomplete evidence
    pub degraded_total: IntCounter,
    /// Symbols that produced no decision, by error kind
    pub failures_total: CounterVec,
    /// Bars and text records skipped as malformed, by kind
    pub skipped_records_total: CounterVec,
    /// Collaborator fetches that came back unavailable, by source
    pub upstream_unavailable_total: CounterVec,
    /// Time to evaluate one symbol, in seconds
    pub evaluation_latency_seconds: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance with all counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let decisions_total = CounterVec::new(
            Opts::new("sigfuse_decisions_total", "Decisions by classification"),
            &["classification"],
        )?;
        registry.register(Box::new(decisions_total.clone()))?;

        let degraded_total = IntCounter::with_opts(Opts::new(
            "sigfuse_degraded_total",
            "Decisions produced from degraded evidence",
        ))?;
        registry.register(Box::new(degraded_total.clone()))?;

        let failures_total = CounterVec::new(
            Opts::new("sigfuse_failures_total", "Symbols without a decision"),
            &["kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let skipped_records_total = CounterVec::new(
            Opts::new(
                "sigfuse_skipped_records_total",
                "Malformed bars and text records skipped",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(skipped_records_total.clone()))?;

        let upstream_unavailable_total = CounterVec::new(
            Opts::new(
                "sigfuse_upstream_unavailable_total",
                "Collaborator fetches reported unavailable",
            ),
            &["source"],
        )?;
        registry.register(Box::new(upstream_unavailable_total.clone()))?;

        let evaluation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sigfuse_evaluation_latency_seconds",
                "Per-symbol evaluation latency in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(evaluation_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            decisions_total,
            degraded_total,
            failures_total,
            skipped_records_total,
            upstream_unavailable_total,
            evaluation_latency_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Starts timing one evaluation; the latency is recorded on drop.
    pub fn start_evaluation_timer(&self) -> HistogramTimer {
        self.evaluation_latency_seconds.start_timer()
    }

    pub fn record_decision(&self, decision: &Decision) {
        self.decisions_total
            .with_label_values(&[&decision.classification.to_string()])
            .inc();
        if decision.degraded {
            self.degraded_total.inc();
        }
    }

    pub fn record_failure(&self, error: &EngineError) {
        let kind = match error {
            EngineError::InvalidConfiguration { .. } => "invalid_configuration",
            EngineError::InvalidInput { .. } => "invalid_input",
            EngineError::NoPriceData { .. } => "no_price_data",
        };
        self.failures_total.with_label_values(&[kind]).inc();
    }

    pub fn record_skipped(&self, kind: &str, count: usize) {
        if count > 0 {
            self.skipped_records_total
                .with_label_values(&[kind])
                .inc_by(count as f64);
        }
    }

    pub fn inc_unavailable(&self, source: &str) {
        self.upstream_unavailable_total
            .with_label_values(&[source])
            .inc();
    }

    /// Decisions counted so far for one classification
    pub fn decisions_for(&self, classification: Classification) -> u64 {
        self.decisions_total
            .with_label_values(&[&classification.to_string()])
            .get() as u64
    }

    pub fn failures(&self) -> u64 {
        ["invalid_configuration", "invalid_input", "no_price_data"]
            .iter()
            .map(|kind| self.failures_total.with_label_values(&[*kind]).get() as u64)
            .sum()
    }
}
