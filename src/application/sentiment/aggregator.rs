use super::catalyst::CatalystScorer;
use super::scorer::{TextScorer, build_text_scorer};
use crate::config::Config;
use crate::domain::errors::{EngineError, MalformedRecord};
use crate::domain::sentiment::{AggregatedSentiment, SentimentRecord};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Reduces a symbol's text records into one time-decayed score.
pub struct SentimentAggregator {
    scorer: Box<dyn TextScorer>,
    half_life_hours: f64,
    catalyst: Option<CatalystScorer>,
}

impl SentimentAggregator {
    pub fn new(scorer: Box<dyn TextScorer>, half_life_hours: f64) -> Self {
        Self {
            scorer,
            half_life_hours,
            catalyst: None,
        }
    }

    /// Also counts catalyst mentions in the usable records' text.
    pub fn with_catalyst(mut self, catalyst: CatalystScorer) -> Self {
        self.catalyst = Some(catalyst);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let catalyst = CatalystScorer::new()
            .map_err(|e| EngineError::invalid_config("catalyst_patterns", e.to_string()))?;
        Ok(Self::new(
            build_text_scorer(config.sentiment_scorer),
            config.sentiment_half_life_hours,
        )
        .with_catalyst(catalyst))
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Decay weight of a record published at `timestamp`, seen from `as_of`.
    ///
    /// Halves every `half_life_hours`; future-dated records weigh 1.
    pub fn decay_weight(&self, timestamp: DateTime<Utc>, as_of: DateTime<Utc>) -> f64 {
        let age_hours = ((as_of - timestamp).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
        (-age_hours / self.half_life_hours).exp2()
    }

    /// Scores one record, or explains why it cannot be used.
    pub fn score_record(&self, symbol: &str, record: &SentimentRecord) -> Result<f64, MalformedRecord> {
        let malformed = |reason: String| MalformedRecord {
            symbol: symbol.to_string(),
            reason,
        };

        if !record.symbol.eq_ignore_ascii_case(symbol) {
            return Err(malformed(format!(
                "record from {} is for {}",
                record.source, record.symbol
            )));
        }

        match record.precomputed_score {
            Some(score) if !score.is_finite() => Err(malformed(format!(
                "non-finite score from {} at {}",
                record.source, record.timestamp
            ))),
            Some(score) => Ok(score.clamp(-1.0, 1.0)),
            None if record.text.trim().is_empty() => Err(malformed(format!(
                "empty text from {} at {}",
                record.source, record.timestamp
            ))),
            None => Ok(self.scorer.score(&record.text).clamp(-1.0, 1.0)),
        }
    }

    /// Exponentially decayed mean of all usable records.
    ///
    /// No usable record gives a neutral result (score 0, no samples).
    pub fn aggregate(
        &self,
        symbol: &str,
        records: &[SentimentRecord],
        as_of: DateTime<Utc>,
    ) -> AggregatedSentiment {
        let mut result = AggregatedSentiment::neutral(symbol, as_of);
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut texts = Vec::new();

        for record in records {
            match self.score_record(symbol, record) {
                Ok(score) => {
                    let weight = self.decay_weight(record.timestamp, as_of);
                    weighted_sum += weight * score;
                    weight_total += weight;
                    result.sample_count += 1;
                    texts.push(record.text.as_str());
                }
                Err(e) => {
                    warn!("Skipping sentiment record: {}", e);
                    result.skipped += 1;
                }
            }
        }

        if weight_total > 0.0 {
            let mean = weighted_sum / weight_total;
            if mean.is_finite() {
                result.mean_score = mean.clamp(-1.0, 1.0);
            }
        }

        if let Some(catalyst) = &self.catalyst {
            let (hits, score) = catalyst.score(texts);
            result.catalyst_hits = hits;
            result.catalyst_score = score;
        }

        debug!(
            "{}: sentiment {:.3} from {} records ({} skipped, scorer={}), catalyst {:.2}",
            symbol,
            result.mean_score,
            result.sample_count,
            result.skipped,
            self.scorer.name(),
            result.catalyst_score
        );

        result
    }
}
