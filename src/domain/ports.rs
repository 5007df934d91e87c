use crate::domain::errors::UpstreamUnavailable;
use crate::domain::market::PriceBar;
use crate::domain::sentiment::SentimentRecord;
use async_trait::async_trait;

/// Result of asking a collaborator for data.
///
/// Unavailability is a value, not an error: the engine consumes it as an
/// empty input set.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(Vec<T>),
    Unavailable(UpstreamUnavailable),
}

impl<T> Fetched<T> {
    pub fn unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable(UpstreamUnavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        })
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Drops the unavailability reason, logging it, and yields the records.
    pub fn into_records(self, symbol: &str) -> Vec<T> {
        match self {
            Self::Data(records) => records,
            Self::Unavailable(reason) => {
                tracing::warn!("{} treated as no data for {}", reason, symbol);
                Vec::new()
            }
        }
    }
}

// Need async_trait for async functions in object-safe traits
#[async_trait]
pub trait PriceBarProvider: Send + Sync {
    /// Ordered bar history for `symbol`, with enough lookback for the indicators.
    async fn fetch_bars(&self, symbol: &str) -> Fetched<PriceBar>;
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Name used in logs and unavailability reports (reddit, news...)
    fn name(&self) -> &str;

    async fn fetch_records(&self, symbol: &str) -> Fetched<SentimentRecord>;
}
