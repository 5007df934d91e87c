//! Positive catalyst detection in news and crowd text.
//!
//! A text is a catalyst when it matches any of [`CATALYST_PATTERNS`]
//! (regulatory approvals, M&A, earnings beats, guidance raises, deals). The
//! symbol-level score is the share of texts that do, so it stays in [0, 1].

use regex::{RegexSet, RegexSetBuilder};

/// Case-insensitive patterns for positive catalysts.
pub const CATALYST_PATTERNS: &[&str] = &[
    r"\bFDA\b",
    r"\bapproval\b",
    r"\bPDUFA\b",
    r"\bphase\s*(III|3)\b",
    r"\bM&A\b|\bmerger\b|\bacquisition\b|\bbuyout\b",
    r"\bearnings\s*(beat|surprise|smash)\b",
    r"\bEPS\s*(beat|surprise)\b",
    r"\brevenue\s*(beat|record)\b",
    r"\bguidance\s*(raise|raised|hike)\b",
    r"\bpartnership\b|\bcontract\b|\bdeal\b",
];

#[derive(Debug, Clone)]
pub struct CatalystScorer {
    patterns: RegexSet,
}

impl CatalystScorer {
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_patterns(CATALYST_PATTERNS)
    }

    pub fn with_patterns(patterns: &[&str]) -> Result<Self, regex::Error> {
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self { patterns })
    }

    pub fn is_catalyst(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }

    /// (hits, share of texts with a hit). Blank texts are not counted.
    pub fn score<'a, I>(&self, texts: I) -> (usize, f64)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut total = 0;
        let mut hits = 0;
        for text in texts.into_iter().filter(|t| !t.trim().is_empty()) {
            total += 1;
            if self.is_catalyst(text) {
                hits += 1;
            }
        }
        if total == 0 {
            return (0, 0.0);
        }
        (hits, (hits as f64 / total as f64).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalyst_patterns_match_case_insensitively() {
        let scorer = CatalystScorer::new().unwrap();
        assert!(scorer.is_catalyst("LABU holdings get fda nod"));
        assert!(scorer.is_catalyst("Acme announces merger with Globex"));
        assert!(scorer.is_catalyst("Q2 Earnings Beat across the board"));
        assert!(scorer.is_catalyst("Phase 3 trial succeeds"));
        assert!(scorer.is_catalyst("Guidance raised for FY25"));
        assert!(!scorer.is_catalyst("earnings miss, guidance cut"));
        // whole words only
        assert!(!scorer.is_catalyst("contractor layoffs"));
    }

    #[test]
    fn test_score_is_share_of_texts() {
        let scorer = CatalystScorer::new().unwrap();
        let texts = [
            "FDA approval expected",
            "nothing to see here",
            "   ",
            "revenue record quarter",
            "market flat",
        ];
        let (hits, score) = scorer.score(texts.iter().copied());
        assert_eq!(hits, 2);
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_texts_scores_zero() {
        let scorer = CatalystScorer::new().unwrap();
        assert_eq!(scorer.score(std::iter::empty()), (0, 0.0));
        assert_eq!(scorer.score(["", "  "]), (0, 0.0));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(CatalystScorer::with_patterns(&[r"(unclosed"]).is_err());
    }
}
