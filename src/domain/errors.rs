use thiserror::Error;

/// An indicator could not be computed because the bar history is too short.
///
/// Never fatal: the indicator is left empty and the state is flagged degraded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{indicator} needs {required} bars, got {available}")]
pub struct InsufficientHistory {
    pub indicator: String,
    pub required: usize,
    pub available: usize,
}

/// A single price bar or sentiment record that was rejected and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed record for {symbol}: {reason}")]
pub struct MalformedRecord {
    pub symbol: String,
    pub reason: String,
}

/// An upstream collaborator (price feed, Reddit, news...) could not deliver data.
///
/// Surfaces to the engine as an empty input set, never as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Upstream {source_name} unavailable: {reason}")]
pub struct UpstreamUnavailable {
    pub source_name: String,
    pub reason: String,
}

/// Errors raised by the decision engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Invalid input for {symbol}: {reason}")]
    InvalidInput { symbol: String, reason: String },

    #[error("No usable price data for {symbol}")]
    NoPriceData { symbol: String },
}

impl EngineError {
    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
