use crate::application::engine::{BatchReport, DecisionEngine, SymbolInput};
use crate::domain::ports::{Fetched, PriceBarProvider, SentimentProvider};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Collects inputs for a set of symbols from the ports and evaluates them.
///
/// At most `max_concurrent_fetches` symbols are being fetched at any time.
/// The CPU-bound batch then runs on the blocking pool so the runtime stays
/// responsive.
pub struct EvaluationService {
    engine: Arc<DecisionEngine>,
    prices: Arc<dyn PriceBarProvider>,
    sentiment_sources: Vec<Arc<dyn SentimentProvider>>,
    max_concurrent_fetches: usize,
}

impl EvaluationService {
    pub fn new(
        engine: Arc<DecisionEngine>,
        prices: Arc<dyn PriceBarProvider>,
        sentiment_sources: Vec<Arc<dyn SentimentProvider>>,
    ) -> Self {
        let max_concurrent_fetches = engine.config().max_concurrent_fetches.max(1);
        Self {
            engine,
            prices,
            sentiment_sources,
            max_concurrent_fetches,
        }
    }

    /// Fetches one symbol's bars and records from every source.
    ///
    /// Unavailable sources contribute nothing; they never fail the symbol.
    pub async fn collect(&self, symbol: &str) -> SymbolInput {
        let bars = self.unwrap_fetched(self.prices.fetch_bars(symbol).await, "prices", symbol);

        let mut records = Vec::new();
        for source in &self.sentiment_sources {
            let fetched = source.fetch_records(symbol).await;
            records.extend(self.unwrap_fetched(fetched, source.name(), symbol));
        }

        SymbolInput::new(symbol, bars, records)
    }

    fn unwrap_fetched<T>(&self, fetched: Fetched<T>, source: &str, symbol: &str) -> Vec<T> {
        if !fetched.is_available() {
            if let Some(metrics) = self.engine.metrics() {
                metrics.inc_unavailable(source);
            }
        }
        fetched.into_records(symbol)
    }

    /// Evaluates `symbols` as of `as_of`, keeping their order in the report.
    pub async fn run(&self, symbols: &[String], as_of: DateTime<Utc>) -> Result<BatchReport> {
        info!(
            "EvaluationService: fetching {} symbols ({} at a time, {} sentiment sources)",
            symbols.len(),
            self.max_concurrent_fetches,
            self.sentiment_sources.len()
        );

        let inputs: Vec<SymbolInput> = stream::iter(symbols.iter())
            .map(|symbol| self.collect(symbol))
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let empty = inputs.iter().filter(|i| i.bars.is_empty()).count();
        if empty > 0 {
            warn!("EvaluationService: {} symbols came back without bars", empty);
        }

        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.evaluate_batch(&inputs, as_of))
            .await
            .context("Batch evaluation task failed")
    }
}
