use crate::domain::errors::InsufficientHistory;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar of a symbol's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Technical indicator snapshot at the latest bar.
///
/// Every numeric field is `None` when the history is too short for that
/// indicator; such gaps are listed in `shortfalls` and flip `degraded`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorState {
    pub symbol: String,
    pub last_close: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    /// Histogram one bar before `macd_hist`, used for cross detection
    pub macd_hist_prev: Option<f64>,
    pub volume_ma: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    /// Position of the close inside the band (0 = lower, 1 = upper)
    pub bollinger_position: Option<f64>,
    pub momentum_5d: Option<f64>,
    pub momentum_20d: Option<f64>,
    pub bars_used: usize,
    #[serde(skip)]
    pub shortfalls: Vec<InsufficientHistory>,
    pub degraded: bool,
}

impl IndicatorState {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    /// Records a missing indicator and marks the state degraded.
    pub fn note_shortfall(&mut self, indicator: &str, required: usize, available: usize) {
        self.shortfalls.push(InsufficientHistory {
            indicator: indicator.to_string(),
            required,
            available,
        });
        self.degraded = true;
    }

    /// RSI has the shortest lookback; without it there is no usable
    /// technical evidence at all.
    pub fn has_minimum_history(&self) -> bool {
        self.rsi.is_some()
    }
}
