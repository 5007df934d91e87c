//! Indicator configuration parsing from environment variables.
//!
//! This module handles loading technical indicator periods and the backend choice.

use super::{IndicatorBackend, Lookup, parse_f64, parse_usize};
use anyhow::{Context, Result};
use std::str::FromStr;

/// Indicator environment configuration
#[derive(Debug, Clone)]
pub struct IndicatorEnvConfig {
    pub backend: IndicatorBackend,

    // RSI
    pub rsi_period: usize,

    // MACD
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,

    // Volume
    pub volume_ma_period: usize,

    // Bollinger
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,

    // Momentum
    pub momentum_windows: [usize; 2],
}

impl IndicatorEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let backend = match lookup("INDICATOR_BACKEND") {
            Some(raw) => IndicatorBackend::from_str(raw.trim())?,
            None => IndicatorBackend::default(),
        };

        let momentum_windows = match lookup("MOMENTUM_WINDOWS") {
            Some(raw) => Self::parse_windows(&raw)?,
            None => [5, 20],
        };

        Ok(Self {
            backend,
            rsi_period: parse_usize(lookup, "RSI_PERIOD", 14)?,
            macd_fast: parse_usize(lookup, "MACD_FAST", 12)?,
            macd_slow: parse_usize(lookup, "MACD_SLOW", 26)?,
            macd_signal: parse_usize(lookup, "MACD_SIGNAL", 9)?,
            volume_ma_period: parse_usize(lookup, "VOLUME_MA_PERIOD", 20)?,
            bollinger_period: parse_usize(lookup, "BOLLINGER_PERIOD", 20)?,
            bollinger_stddev: parse_f64(lookup, "BOLLINGER_STDDEV", 2.0)?,
            momentum_windows,
        })
    }

    /// Parse "5,20" into the short and long momentum windows.
    fn parse_windows(raw: &str) -> Result<[usize; 2]> {
        let parts: Vec<usize> = raw
            .split(',')
            .map(|s| s.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .context("MOMENTUM_WINDOWS must be comma-separated integers")?;

        match parts.as_slice() {
            [short, long] => Ok([*short, *long]),
            _ => anyhow::bail!(
                "MOMENTUM_WINDOWS must hold exactly two windows, got {}",
                raw
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_windows() {
        assert_eq!(IndicatorEnvConfig::parse_windows("5,20").unwrap(), [5, 20]);
        assert_eq!(IndicatorEnvConfig::parse_windows(" 3 , 10 ").unwrap(), [3, 10]);
        assert!(IndicatorEnvConfig::parse_windows("5").is_err());
        assert!(IndicatorEnvConfig::parse_windows("5,20,60").is_err());
        assert!(IndicatorEnvConfig::parse_windows("five,20").is_err());
    }
}
