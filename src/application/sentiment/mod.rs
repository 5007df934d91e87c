//! Sentiment scoring and per-symbol aggregation.

mod aggregator;
mod catalyst;
mod scorer;

pub use aggregator::SentimentAggregator;
pub use catalyst::{CATALYST_PATTERNS, CatalystScorer};
pub use scorer::{LexicalScorer, TextScorer, VaderScorer, build_text_scorer};
