//! Per-record text scoring.
//!
//! Two scorers are available:
//! - [`LexicalScorer`]: counts bullish and bearish keywords (default)
//! - [`VaderScorer`]: VADER compound score from the `vader_sentiment` crate
//!
//! Both return a polarity in [-1, 1], 0 for empty or neutral text.

use crate::config::ScorerKind;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Crowd and news vocabulary read as bullish.
pub const BULLISH_KEYWORDS: &[&str] = &[
    // retail forum slang
    "buy", "bullish", "moon", "rocket", "calls", "long", "pump", "green", "up", "gain", "gains",
    // headline vocabulary
    "surge", "surges", "rally", "rallies", "soar", "soars", "skyrocket", "skyrockets",
    "breakout", "mooning", "upgrade", "breakthrough", "beat", "beats",
];

/// Crowd and news vocabulary read as bearish.
pub const BEARISH_KEYWORDS: &[&str] = &[
    // retail forum slang
    "sell", "bearish", "puts", "short", "dump", "red", "down", "loss", "losses", "crash",
    // headline vocabulary
    "crashes", "dumps", "plunge", "plunges", "collapse", "collapses", "selloff", "panic",
    "downgrade", "lawsuit", "fraud", "bankruptcy",
];

/// Scores a single piece of text.
pub trait TextScorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Polarity in [-1, 1].
    fn score(&self, text: &str) -> f64;
}

/// Keyword polarity: `(bullish - bearish) / (bullish + bearish + 1)`.
///
/// Matching is done on lowercase alphanumeric tokens, so "upgrade" does not
/// count as "up" and "Short-squeeze" counts as "short".
#[derive(Debug, Clone, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Returns (bullish, bearish) keyword hits.
    pub fn keyword_counts(&self, text: &str) -> (usize, usize) {
        let lowered = text.to_lowercase();
        let mut bullish = 0;
        let mut bearish = 0;

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if BULLISH_KEYWORDS.contains(&token) {
                bullish += 1;
            } else if BEARISH_KEYWORDS.contains(&token) {
                bearish += 1;
            }
        }

        (bullish, bearish)
    }
}

impl TextScorer for LexicalScorer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn score(&self, text: &str) -> f64 {
        let (bullish, bearish) = self.keyword_counts(text);
        let (b, r) = (bullish as f64, bearish as f64);
        (b - r) / (b + r + 1.0)
    }
}

/// VADER compound score, tuned for social media text.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextScorer for VaderScorer {
    fn name(&self) -> &'static str {
        "vader"
    }

    fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let scores = self.analyzer.polarity_scores(text);
        scores
            .get("compound")
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}

pub fn build_text_scorer(kind: ScorerKind) -> Box<dyn TextScorer> {
    match kind {
        ScorerKind::Lexical => Box::new(LexicalScorer::new()),
        ScorerKind::Vader => Box::new(VaderScorer::new()),
    }
}
