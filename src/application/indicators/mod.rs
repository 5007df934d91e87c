//! Technical indicator computation.
//!
//! [`IndicatorEngine`] owns the history gating and assembly of an
//! [`IndicatorState`]; implementations only supply the numeric kernels. Two
//! implementations exist and one is picked at construction time:
//! [`NativeIndicatorEngine`] (Wilder RSI, SMA-seeded EMAs) and
//! [`TaIndicatorEngine`] (backed by the `ta` crate).

mod native;
mod ta_backed;

pub use native::NativeIndicatorEngine;
pub use ta_backed::TaIndicatorEngine;

use crate::config::{Config, IndicatorBackend};
use crate::domain::errors::MalformedRecord;
use crate::domain::market::{IndicatorState, PriceBar};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

/// Lookback periods shared by every engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPeriods {
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_ma: usize,
    pub bollinger: usize,
    pub bollinger_stddev: f64,
    pub momentum_short: usize,
    pub momentum_long: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for IndicatorPeriods {
    fn from(config: &Config) -> Self {
        Self {
            rsi: config.rsi_period,
            macd_fast: config.macd_fast,
            macd_slow: config.macd_slow,
            macd_signal: config.macd_signal,
            volume_ma: config.volume_ma_period,
            bollinger: config.bollinger_period,
            bollinger_stddev: config.bollinger_stddev,
            momentum_short: config.momentum_windows[0],
            momentum_long: config.momentum_windows[1],
        }
    }
}

impl IndicatorPeriods {
    pub fn rsi_required(&self) -> usize {
        self.rsi + 1
    }

    pub fn macd_required(&self) -> usize {
        self.macd_slow + self.macd_signal
    }
}

/// MACD values at the last bar, plus the histogram one bar earlier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub line: f64,
    pub signal: f64,
    pub hist: f64,
    pub hist_prev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandsOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub trait IndicatorEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn periods(&self) -> &IndicatorPeriods;

    /// RSI at the last close; called with at least `rsi + 1` closes.
    fn rsi(&self, closes: &[f64]) -> Option<f64>;

    /// Called with at least `macd_slow + macd_signal` closes.
    fn macd(&self, closes: &[f64]) -> Option<MacdOutput>;

    /// Called with at least `bollinger` closes.
    fn bollinger(&self, closes: &[f64]) -> Option<BandsOutput>;

    /// Called with at least `volume_ma` volumes.
    fn volume_ma(&self, volumes: &[f64]) -> Option<f64>;

    /// Percentage change of the last close over `window` bars; called with
    /// at least `window + 1` closes.
    fn momentum(&self, closes: &[f64], window: usize) -> Option<f64> {
        let last = *closes.last()?;
        let base = *closes.get(closes.len().checked_sub(window + 1)?)?;
        if base <= 0.0 {
            return None;
        }
        Some((last - base) / base * 100.0)
    }

    /// Computes the indicator state at the last bar of `bars`.
    ///
    /// `bars` are expected to be sanitized (see [`sanitize_bars`]). Any
    /// indicator without enough history is left `None` and recorded as a
    /// shortfall; that is a degraded state, not an error.
    fn compute(&self, symbol: &str, bars: &[PriceBar]) -> IndicatorState {
        let p = *self.periods();
        let closes: Vec<f64> = bars.iter().filter_map(|b| b.close.to_f64()).collect();
        let volumes: Vec<f64> = bars.iter().filter_map(|b| b.volume.to_f64()).collect();
        let n = closes.len();

        let mut state = IndicatorState::empty(symbol);
        state.bars_used = n;
        state.last_close = closes.last().copied();

        // RSI
        if n >= p.rsi_required() {
            state.rsi = self.rsi(&closes).and_then(finite).map(|v| v.clamp(0.0, 100.0));
        } else {
            state.note_shortfall("rsi", p.rsi_required(), n);
        }

        // MACD
        if n >= p.macd_required() {
            if let Some(macd) = self.macd(&closes) {
                state.macd_line = finite(macd.line);
                state.macd_signal = finite(macd.signal);
                state.macd_hist = finite(macd.hist);
                state.macd_hist_prev = finite(macd.hist_prev);
            }
        } else {
            state.note_shortfall("macd", p.macd_required(), n);
        }

        // Volume
        if volumes.len() >= p.volume_ma {
            state.volume_ma = self.volume_ma(&volumes).and_then(finite);
            state.volume_ratio = match (state.volume_ma, volumes.last()) {
                (Some(ma), Some(latest)) if ma > 0.0 => finite(latest / ma),
                _ => None,
            };
        } else {
            state.note_shortfall("volume_ma", p.volume_ma, volumes.len());
        }

        // Bollinger
        if n >= p.bollinger {
            if let Some(bands) = self.bollinger(&closes) {
                state.bollinger_upper = finite(bands.upper);
                state.bollinger_middle = finite(bands.middle);
                state.bollinger_lower = finite(bands.lower);
                let width = bands.upper - bands.lower;
                state.bollinger_position = match state.last_close {
                    Some(close) if width > 1e-9 => finite((close - bands.lower) / width),
                    _ => None,
                };
            }
        } else {
            state.note_shortfall("bollinger", p.bollinger, n);
        }

        // Momentum
        if n > p.momentum_short {
            state.momentum_5d = self.momentum(&closes, p.momentum_short).and_then(finite);
        } else {
            state.note_shortfall("momentum_5d", p.momentum_short + 1, n);
        }
        if n > p.momentum_long {
            state.momentum_20d = self.momentum(&closes, p.momentum_long).and_then(finite);
        } else {
            state.note_shortfall("momentum_20d", p.momentum_long + 1, n);
        }

        // A kernel may still refuse to produce a value with enough bars
        let missing_value = state.rsi.is_none() && n >= p.rsi_required()
            || state.macd_hist.is_none() && n >= p.macd_required()
            || state.volume_ratio.is_none() && volumes.len() >= p.volume_ma
            || state.bollinger_middle.is_none() && n >= p.bollinger;
        if missing_value {
            state.degraded = true;
        }

        debug!(
            "{}: {} indicators over {} bars (degraded={}, rsi={:?}, macd_hist={:?}, volume_ratio={:?})",
            symbol,
            self.name(),
            n,
            state.degraded,
            state.rsi,
            state.macd_hist,
            state.volume_ratio
        );

        state
    }
}

/// Builds the configured engine. Called once per `DecisionEngine`.
pub fn build_indicator_engine(config: &Config) -> Box<dyn IndicatorEngine> {
    let periods = IndicatorPeriods::from(config);
    match config.indicator_backend {
        IndicatorBackend::Native => Box::new(NativeIndicatorEngine::new(periods)),
        IndicatorBackend::Ta => Box::new(TaIndicatorEngine::new(periods)),
    }
}

/// Drops bars that cannot be used, keeping the rest in order.
///
/// A bar is rejected when any price is non-positive, `high < low`, the volume
/// is negative, or its timestamp does not come strictly after the previous
/// kept bar.
pub fn sanitize_bars(symbol: &str, bars: &[PriceBar]) -> (Vec<PriceBar>, Vec<MalformedRecord>) {
    let mut kept: Vec<PriceBar> = Vec::with_capacity(bars.len());
    let mut rejected = Vec::new();

    for bar in bars {
        let reason = if bar.open <= Decimal::ZERO
            || bar.high <= Decimal::ZERO
            || bar.low <= Decimal::ZERO
            || bar.close <= Decimal::ZERO
        {
            Some(format!("non-positive price at {}", bar.timestamp))
        } else if bar.high < bar.low {
            Some(format!(
                "high {} below low {} at {}",
                bar.high, bar.low, bar.timestamp
            ))
        } else if bar.volume < Decimal::ZERO {
            Some(format!("negative volume at {}", bar.timestamp))
        } else if kept.last().is_some_and(|prev| bar.timestamp <= prev.timestamp) {
            Some(format!("out-of-order timestamp {}", bar.timestamp))
        } else {
            None
        };

        match reason {
            Some(reason) => {
                let record = MalformedRecord {
                    symbol: symbol.to_string(),
                    reason,
                };
                warn!("Skipping bar: {}", record);
                rejected.push(record);
            }
            None => kept.push(bar.clone()),
        }
    }

    (kept, rejected)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
