//! Configuration module for sigfuse.
//!
//! One immutable [`Config`] is built at startup, either from environment
//! variables (optionally seeded from `.env`) or from a TOML file, validated
//! once, and then passed by reference into every component.

mod fusion_config;
mod indicator_config;
mod risk_env_config;

pub use fusion_config::FusionEnvConfig;
pub use indicator_config::IndicatorEnvConfig;
pub use risk_env_config::RiskEnvConfig;

use crate::domain::errors::EngineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Largest accepted indicator period or momentum window, in bars.
pub const MAX_PERIOD: usize = 10_000;

/// Source of raw configuration values, keyed by variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Which indicator implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorBackend {
    #[default]
    Native,
    /// Backed by the `ta` crate
    Ta,
}

impl FromStr for IndicatorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(IndicatorBackend::Native),
            "ta" => Ok(IndicatorBackend::Ta),
            _ => anyhow::bail!(
                "Invalid INDICATOR_BACKEND: {}. Must be 'native' or 'ta'",
                s
            ),
        }
    }
}

/// How text without a precomputed score is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    #[default]
    Lexical,
    Vader,
}

impl FromStr for ScorerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" => Ok(ScorerKind::Lexical),
            "vader" => Ok(ScorerKind::Vader),
            _ => anyhow::bail!(
                "Invalid SENTIMENT_SCORER: {}. Must be 'lexical' or 'vader'",
                s
            ),
        }
    }
}

/// Signed weight of each evidence factor in the fused score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub macd: f64,
    pub rsi: f64,
    pub volume: f64,
    pub momentum: f64,
    pub sentiment: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            macd: 0.30,
            rsi: 0.25,
            volume: 0.15,
            momentum: 0.10,
            sentiment: 0.20,
        }
    }
}

impl FusionWeights {
    pub fn total(&self) -> f64 {
        self.macd + self.rsi + self.volume + self.momentum + self.sentiment
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub symbols: Vec<String>,

    // Indicators
    pub indicator_backend: IndicatorBackend,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_ma_period: usize,
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,
    /// Short and long momentum windows, in bars
    pub momentum_windows: [usize; 2],

    // Fusion
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_surge_threshold: f64,
    pub weights: FusionWeights,
    /// Score added when every text mentions a catalyst; scaled by the share
    pub catalyst_boost: f64,

    // Sentiment
    pub sentiment_half_life_hours: f64,
    pub sentiment_scorer: ScorerKind,

    // Risk
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub partial_sell_fraction: f64,
    pub base_position_fraction: f64,
    pub min_position_fraction: f64,
    pub max_position_fraction: f64,
    pub allow_short: bool,

    // Collaborators
    pub max_concurrent_fetches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec!["TQQQ".to_string(), "SOXL".to_string(), "LABU".to_string()],
            indicator_backend: IndicatorBackend::Native,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_ma_period: 20,
            bollinger_period: 20,
            bollinger_stddev: 2.0,
            momentum_windows: [5, 20],
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            volume_surge_threshold: 1.5,
            weights: FusionWeights::default(),
            catalyst_boost: 0.15,
            sentiment_half_life_hours: 24.0,
            sentiment_scorer: ScorerKind::Lexical,
            stop_loss_pct: 0.08,
            take_profit_pct: 0.20,
            partial_sell_fraction: 0.5,
            base_position_fraction: 0.20,
            min_position_fraction: 0.02,
            max_position_fraction: 0.25,
            allow_short: false,
            max_concurrent_fetches: 4,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source, composing the
    /// per-concern sub-configs and validating the result.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let indicators =
            IndicatorEnvConfig::from_lookup(lookup).context("Failed to load indicator config")?;
        let fusion = FusionEnvConfig::from_lookup(lookup).context("Failed to load fusion config")?;
        let risk = RiskEnvConfig::from_lookup(lookup).context("Failed to load risk config")?;

        let config = Self {
            symbols: risk.symbols,

            indicator_backend: indicators.backend,
            rsi_period: indicators.rsi_period,
            macd_fast: indicators.macd_fast,
            macd_slow: indicators.macd_slow,
            macd_signal: indicators.macd_signal,
            volume_ma_period: indicators.volume_ma_period,
            bollinger_period: indicators.bollinger_period,
            bollinger_stddev: indicators.bollinger_stddev,
            momentum_windows: indicators.momentum_windows,

            rsi_oversold: fusion.rsi_oversold,
            rsi_overbought: fusion.rsi_overbought,
            volume_surge_threshold: fusion.volume_surge_threshold,
            weights: fusion.weights,
            catalyst_boost: fusion.catalyst_boost,
            sentiment_half_life_hours: fusion.sentiment_half_life_hours,
            sentiment_scorer: fusion.sentiment_scorer,

            stop_loss_pct: risk.stop_loss_pct,
            take_profit_pct: risk.take_profit_pct,
            partial_sell_fraction: risk.partial_sell_fraction,
            base_position_fraction: risk.base_position_fraction,
            min_position_fraction: risk.min_position_fraction,
            max_position_fraction: risk.max_position_fraction,
            allow_short: risk.allow_short,
            max_concurrent_fetches: risk.max_concurrent_fetches,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Bars needed for every indicator to be populated.
    pub fn required_lookback(&self) -> usize {
        [
            self.rsi_period + 1,
            self.macd_slow + self.macd_signal,
            self.volume_ma_period,
            self.bollinger_period,
            self.momentum_windows[1] + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value) in [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("volume_ma_period", self.volume_ma_period),
            ("bollinger_period", self.bollinger_period),
            ("momentum_windows", self.momentum_windows[0]),
            ("momentum_windows", self.momentum_windows[1]),
        ] {
            if value > MAX_PERIOD {
                return Err(EngineError::invalid_config(
                    field,
                    format!("must be <= {}, got {}", MAX_PERIOD, value),
                ));
            }
        }
        for (field, value) in [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("volume_ma_period", self.volume_ma_period),
            ("bollinger_period", self.bollinger_period),
            ("momentum_windows", self.momentum_windows[0]),
            ("momentum_windows", self.momentum_windows[1]),
            ("max_concurrent_fetches", self.max_concurrent_fetches),
        ] {
            if value == 0 {
                return Err(EngineError::invalid_config(field, "must be > 0"));
            }
        }

        if self.macd_fast >= self.macd_slow {
            return Err(EngineError::invalid_config(
                "macd_fast",
                format!(
                    "must be below macd_slow ({} >= {})",
                    self.macd_fast, self.macd_slow
                ),
            ));
        }
        if self.momentum_windows[0] >= self.momentum_windows[1] {
            return Err(EngineError::invalid_config(
                "momentum_windows",
                format!(
                    "short window must be below long window, got {:?}",
                    self.momentum_windows
                ),
            ));
        }
        if !(self.bollinger_stddev.is_finite() && self.bollinger_stddev > 0.0) {
            return Err(EngineError::invalid_config(
                "bollinger_stddev",
                format!("must be > 0, got {}", self.bollinger_stddev),
            ));
        }
        if !(0.0 < self.rsi_oversold
            && self.rsi_oversold < self.rsi_overbought
            && self.rsi_overbought < 100.0)
        {
            return Err(EngineError::invalid_config(
                "rsi_oversold",
                format!(
                    "need 0 < oversold < overbought < 100, got {} / {}",
                    self.rsi_oversold, self.rsi_overbought
                ),
            ));
        }
        if !(self.volume_surge_threshold.is_finite() && self.volume_surge_threshold > 0.0) {
            return Err(EngineError::invalid_config(
                "volume_surge_threshold",
                format!("must be > 0, got {}", self.volume_surge_threshold),
            ));
        }

        let w = &self.weights;
        for (field, value) in [
            ("weights.macd", w.macd),
            ("weights.rsi", w.rsi),
            ("weights.volume", w.volume),
            ("weights.momentum", w.momentum),
            ("weights.sentiment", w.sentiment),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::invalid_config(
                    field,
                    format!("must be >= 0, got {}", value),
                ));
            }
        }
        if w.total() <= 0.0 {
            return Err(EngineError::invalid_config(
                "weights",
                "at least one weight must be positive",
            ));
        }

        if !(self.catalyst_boost.is_finite() && (0.0..=1.0).contains(&self.catalyst_boost)) {
            return Err(EngineError::invalid_config(
                "catalyst_boost",
                format!("must be in [0, 1], got {}", self.catalyst_boost),
            ));
        }

        if !(self.sentiment_half_life_hours.is_finite() && self.sentiment_half_life_hours > 0.0) {
            return Err(EngineError::invalid_config(
                "sentiment_half_life_hours",
                format!("must be > 0, got {}", self.sentiment_half_life_hours),
            ));
        }

        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0) {
            return Err(EngineError::invalid_config(
                "stop_loss_pct",
                format!("must be in (0, 1), got {}", self.stop_loss_pct),
            ));
        }
        if !(self.take_profit_pct.is_finite() && self.take_profit_pct > 0.0) {
            return Err(EngineError::invalid_config(
                "take_profit_pct",
                format!("must be > 0, got {}", self.take_profit_pct),
            ));
        }
        // A short's target sits below entry and must stay positive
        if self.allow_short && self.take_profit_pct >= 1.0 {
            return Err(EngineError::invalid_config(
                "take_profit_pct",
                format!(
                    "must be below 1 when shorting is allowed, got {}",
                    self.take_profit_pct
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.partial_sell_fraction) {
            return Err(EngineError::invalid_config(
                "partial_sell_fraction",
                format!("must be in [0, 1], got {}", self.partial_sell_fraction),
            ));
        }
        if !(self.base_position_fraction.is_finite() && self.base_position_fraction >= 0.0) {
            return Err(EngineError::invalid_config(
                "base_position_fraction",
                format!("must be >= 0, got {}", self.base_position_fraction),
            ));
        }
        if !(0.0 <= self.min_position_fraction
            && self.min_position_fraction <= self.max_position_fraction
            && self.max_position_fraction <= 1.0)
        {
            return Err(EngineError::invalid_config(
                "min_position_fraction",
                format!(
                    "need 0 <= min <= max <= 1, got {} / {}",
                    self.min_position_fraction, self.max_position_fraction
                ),
            ));
        }

        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(EngineError::invalid_config(
                "symbols",
                "symbol names must not be empty",
            ));
        }

        Ok(())
    }
}

pub(crate) fn parse_usize(lookup: Lookup<'_>, key: &str, default: usize) -> Result<usize> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("Failed to parse {} as integer: {}", key, raw)),
        None => Ok(default),
    }
}

pub(crate) fn parse_f64(lookup: Lookup<'_>, key: &str, default: f64) -> Result<f64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Failed to parse {} as number: {}", key, raw)),
        None => Ok(default),
    }
}

pub(crate) fn parse_bool(lookup: Lookup<'_>, key: &str, default: bool) -> Result<bool> {
    match lookup(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => anyhow::bail!("Failed to parse {} as boolean: {}", key, raw),
        },
        None => Ok(default),
    }
}
