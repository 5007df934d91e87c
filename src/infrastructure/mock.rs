use crate::domain::market::PriceBar;
use crate::domain::ports::{Fetched, PriceBarProvider, SentimentProvider};
use crate::domain::sentiment::SentimentRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Price history kept in memory, keyed by symbol.
///
/// Unknown symbols come back as empty data, the same as a feed that has
/// nothing for them.
#[derive(Clone, Default)]
pub struct InMemoryPriceBarProvider {
    bars: Arc<RwLock<HashMap<String, Vec<PriceBar>>>>,
}

impl InMemoryPriceBarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(bars: HashMap<String, Vec<PriceBar>>) -> Self {
        Self {
            bars: Arc::new(RwLock::new(bars)),
        }
    }

    pub async fn insert(&self, symbol: &str, bars: Vec<PriceBar>) {
        self.bars.write().await.insert(symbol.to_string(), bars);
    }
}

#[async_trait]
impl PriceBarProvider for InMemoryPriceBarProvider {
    async fn fetch_bars(&self, symbol: &str) -> Fetched<PriceBar> {
        let bars = self.bars.read().await;
        let found = bars.get(symbol).cloned().unwrap_or_default();
        debug!("InMemoryPriceBarProvider: {} bars for {}", found.len(), symbol);
        Fetched::Data(found)
    }
}

/// Text records kept in memory; `fetch_records` returns the ones whose
/// symbol matches.
#[derive(Clone)]
pub struct InMemorySentimentProvider {
    name: String,
    records: Arc<RwLock<Vec<SentimentRecord>>>,
}

impl InMemorySentimentProvider {
    pub fn new(name: &str, records: Vec<SentimentRecord>) -> Self {
        Self {
            name: name.to_string(),
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn push(&self, record: SentimentRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl SentimentProvider for InMemorySentimentProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_records(&self, symbol: &str) -> Fetched<SentimentRecord> {
        let records = self.records.read().await;
        Fetched::Data(
            records
                .iter()
                .filter(|r| r.symbol.eq_ignore_ascii_case(symbol))
                .cloned()
                .collect(),
        )
    }
}

/// A collaborator that is always down. Serves both ports.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    name: String,
    reason: String,
}

impl UnavailableProvider {
    pub fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl PriceBarProvider for UnavailableProvider {
    async fn fetch_bars(&self, _symbol: &str) -> Fetched<PriceBar> {
        Fetched::unavailable(&self.name, self.reason.clone())
    }
}

#[async_trait]
impl SentimentProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_records(&self, _symbol: &str) -> Fetched<SentimentRecord> {
        Fetched::unavailable(&self.name, self.reason.clone())
    }
}
