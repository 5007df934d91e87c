use crate::application::indicators::{IndicatorEngine, build_indicator_engine, sanitize_bars};
use crate::application::risk_management::RiskCalculator;
use crate::application::sentiment::SentimentAggregator;
use crate::application::signal_fusion::SignalFusion;
use crate::config::Config;
use crate::domain::decision::{Classification, Decision};
use crate::domain::errors::EngineError;
use crate::domain::market::PriceBar;
use crate::domain::sentiment::SentimentRecord;
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Everything needed to evaluate one symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolInput {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub records: Vec<SentimentRecord>,
}

impl SymbolInput {
    pub fn new(symbol: &str, bars: Vec<PriceBar>, records: Vec<SentimentRecord>) -> Self {
        Self {
            symbol: symbol.to_string(),
            bars,
            records,
        }
    }
}

/// Result of evaluating one symbol in a batch
#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<Decision, EngineError>,
}

/// Outcomes of one batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub as_of: DateTime<Utc>,
    pub outcomes: Vec<SymbolOutcome>,
}

/// Counts per batch, for logs and the JSON snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub symbols: usize,
    pub decisions: usize,
    pub failures: usize,
    pub degraded: usize,
    pub by_classification: BTreeMap<String, usize>,
}

impl BatchReport {
    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &EngineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.symbol.as_str(), e)))
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.outcomes.iter().find(|o| o.symbol == symbol)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            symbols: self.outcomes.len(),
            by_classification: Classification::ALL
                .iter()
                .map(|c| (c.to_string(), 0))
                .collect(),
            ..BatchSummary::default()
        };
        for decision in self.decisions() {
            summary.decisions += 1;
            if decision.degraded {
                summary.degraded += 1;
            }
            *summary
                .by_classification
                .entry(decision.classification.to_string())
                .or_default() += 1;
        }
        summary.failures = summary.symbols - summary.decisions;
        summary
    }
}

/// Runs indicators, sentiment, fusion and risk for one symbol at a time.
///
/// Holds only configuration-derived components; nothing is carried between
/// evaluations, so the same inputs and `as_of` always give the same Decision.
pub struct DecisionEngine {
    config: Config,
    indicators: Box<dyn IndicatorEngine>,
    sentiment: SentimentAggregator,
    fusion: SignalFusion,
    risk: RiskCalculator,
    metrics: Option<Metrics>,
}

impl DecisionEngine {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        config.validate()?;

        let indicators = build_indicator_engine(&config);
        let sentiment = SentimentAggregator::from_config(&config)?;
        let fusion = SignalFusion::from_config(&config);
        let risk = RiskCalculator::from_config(&config)?;

        info!(
            "DecisionEngine: indicators={}, scorer={}, lookback={} bars, allow_short={}",
            indicators.name(),
            sentiment.scorer_name(),
            config.required_lookback(),
            config.allow_short
        );

        Ok(Self {
            config,
            indicators,
            sentiment,
            fusion,
            risk,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Evaluates one symbol.
    ///
    /// Malformed bars and records are skipped. The only failures are a symbol
    /// without a single usable bar (no entry price) and a non-positive entry.
    pub fn evaluate(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        records: &[SentimentRecord],
        as_of: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        let _timer = self.metrics.as_ref().map(|m| m.start_evaluation_timer());

        let (bars, rejected) = sanitize_bars(symbol, bars);
        if let Some(metrics) = &self.metrics {
            metrics.record_skipped("bars", rejected.len());
        }
        let Some(last_bar) = bars.last() else {
            warn!("{}: no usable price bars", symbol);
            return Err(EngineError::NoPriceData {
                symbol: symbol.to_string(),
            });
        };
        let entry_price = last_bar.close;

        let state = self.indicators.compute(symbol, &bars);
        let sentiment = self.sentiment.aggregate(symbol, records, as_of);
        if let Some(metrics) = &self.metrics {
            metrics.record_skipped("records", sentiment.skipped);
        }

        let fusion = self.fusion.fuse(&state, &sentiment);
        let mut decision = self
            .risk
            .apply(symbol, &fusion, &sentiment, entry_price, as_of)?;

        if !rejected.is_empty() {
            decision
                .reasons
                .push(format!("Skipped {} malformed bars", rejected.len()));
        }

        debug!(
            "{}: {} (confidence {:.2}, action {}, degraded={})",
            symbol, decision.classification, decision.confidence, decision.action, decision.degraded
        );

        Ok(decision)
    }

    /// Evaluates every symbol on the rayon pool.
    ///
    /// Outcomes come back in input order; a failing symbol never affects the
    /// others.
    pub fn evaluate_batch(&self, inputs: &[SymbolInput], as_of: DateTime<Utc>) -> BatchReport {
        let outcomes: Vec<SymbolOutcome> = inputs
            .par_iter()
            .map(|input| SymbolOutcome {
                symbol: input.symbol.clone(),
                result: self.evaluate(&input.symbol, &input.bars, &input.records, as_of),
            })
            .collect();

        let report = BatchReport { as_of, outcomes };

        if let Some(metrics) = &self.metrics {
            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(decision) => metrics.record_decision(decision),
                    Err(e) => metrics.record_failure(e),
                }
            }
        }
        for (symbol, error) in report.failures() {
            warn!("{}: no decision: {}", symbol, error);
        }

        let summary = report.summary();
        info!(
            "Batch as of {}: {} symbols, {} decisions ({} degraded), {} failed",
            as_of, summary.symbols, summary.decisions, summary.degraded, summary.failures
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::test_support::{bars_from_closes, wavy_closes};
    use crate::config::IndicatorBackend;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 21, 0, 0).unwrap()
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(Config::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            max_position_fraction: 2.0,
            ..Config::default()
        };
        let err = DecisionEngine::new(config).err().unwrap();
        assert!(matches!(err, EngineError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_huge_periods_are_rejected_before_lookback_is_computed() {
        let config = Config {
            rsi_period: usize::MAX,
            macd_signal: usize::MAX,
            ..Config::default()
        };
        let err = DecisionEngine::new(config).err().unwrap();
        assert!(matches!(err, EngineError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_short_history_holds_with_zero_confidence() {
        let bars = bars_from_closes(&wavy_closes(10, 1.0), 1_000.0);
        let records = vec![SentimentRecord::new("TQQQ", as_of(), "reddit", "").with_score(1.0)];
        let decision = engine().evaluate("TQQQ", &bars, &records, as_of()).unwrap();
        assert_eq!(decision.classification, Classification::Hold);
        assert_eq!(decision.confidence, 0.0);
        assert!(decision.degraded);
        assert_eq!(decision.position_size_fraction, 0.0);
    }

    #[test]
    fn test_no_bars_is_no_price_data() {
        let err = engine().evaluate("SOXL", &[], &[], as_of()).unwrap_err();
        assert_eq!(
            err,
            EngineError::NoPriceData {
                symbol: "SOXL".to_string()
            }
        );
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let bars = bars_from_closes(&wavy_closes(80, 0.4), 2_000.0);
        let records = vec![
            SentimentRecord::new("LABU", as_of(), "reddit", "buy calls"),
            SentimentRecord::new("LABU", as_of(), "news", "").with_score(-0.2),
        ];
        let engine = engine();
        let first = engine.evaluate("LABU", &bars, &records, as_of()).unwrap();
        let second = engine.evaluate("LABU", &bars, &records, as_of()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.generated_at, as_of());
        assert_eq!(first.sentiment_samples, 2);
    }

    #[test]
    fn test_backends_agree_on_gating() {
        let ta_engine = DecisionEngine::new(Config {
            indicator_backend: IndicatorBackend::Ta,
            ..Config::default()
        })
        .unwrap();
        let bars = bars_from_closes(&wavy_closes(10, 1.0), 1_000.0);
        for engine in [engine(), ta_engine] {
            let decision = engine.evaluate("TQQQ", &bars, &[], as_of()).unwrap();
            assert_eq!(decision.classification, Classification::Hold);
            assert!(decision.degraded);
        }
    }

    #[test]
    fn test_batch_isolates_failures_and_keeps_order() {
        let good = bars_from_closes(&wavy_closes(60, 0.2), 1_000.0);
        let mut broken = good.clone();
        for bar in &mut broken {
            bar.close = rust_decimal::Decimal::ZERO;
        }
        let inputs = vec![
            SymbolInput::new("TQQQ", good.clone(), vec![]),
            SymbolInput::new("SOXL", broken, vec![]),
            SymbolInput::new("LABU", good, vec![]),
        ];

        let metrics = Metrics::new().unwrap();
        let engine = engine().with_metrics(metrics.clone());
        let report = engine.evaluate_batch(&inputs, as_of());

        let symbols: Vec<&str> = report.outcomes.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TQQQ", "SOXL", "LABU"]);
        assert!(report.get("TQQQ").unwrap().result.is_ok());
        assert!(matches!(
            report.get("SOXL").unwrap().result,
            Err(EngineError::NoPriceData { .. })
        ));
        assert!(report.get("LABU").unwrap().result.is_ok());

        let summary = report.summary();
        assert_eq!(summary.symbols, 3);
        assert_eq!(summary.decisions, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.by_classification.values().sum::<usize>(), 2);
        assert_eq!(metrics.failures(), 1);
        assert_eq!(metrics.evaluation_latency_seconds.get_sample_count(), 3);
    }

    #[test]
    fn test_skipped_bars_are_reported_in_reasons() {
        let mut bars = bars_from_closes(&wavy_closes(60, 0.2), 1_000.0);
        bars[10].volume = rust_decimal::Decimal::NEGATIVE_ONE;
        let decision = engine().evaluate("TQQQ", &bars, &[], as_of()).unwrap();
        assert!(decision.reasons.iter().any(|r| r == "Skipped 1 malformed bars"));
    }
}
