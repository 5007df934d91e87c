use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A piece of crowd or news text mentioning a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Origin of the text (reddit, twitter, news...)
    pub source: String,
    pub text: String,
    /// Score already computed upstream, in [-1, 1]
    #[serde(default)]
    pub precomputed_score: Option<f64>,
}

impl SentimentRecord {
    pub fn new(symbol: &str, timestamp: DateTime<Utc>, source: &str, text: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            source: source.to_string(),
            text: text.to_string(),
            precomputed_score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.precomputed_score = Some(score);
        self
    }
}

/// Time-decayed sentiment of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSentiment {
    pub symbol: String,
    /// Weighted mean in [-1, 1]; 0 when there are no samples
    pub mean_score: f64,
    pub sample_count: usize,
    /// Records rejected as malformed
    pub skipped: usize,
    /// Share of texts mentioning a positive catalyst, in [0, 1]
    #[serde(default)]
    pub catalyst_score: f64,
    #[serde(default)]
    pub catalyst_hits: usize,
    pub as_of: DateTime<Utc>,
}

impl AggregatedSentiment {
    pub fn neutral(symbol: &str, as_of: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            mean_score: 0.0,
            sample_count: 0,
            skipped: 0,
            catalyst_score: 0.0,
            catalyst_hits: 0,
            as_of,
        }
    }

    pub fn has_samples(&self) -> bool {
        self.sample_count > 0
    }
}
