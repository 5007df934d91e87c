//! Fusion and sentiment configuration parsing from environment variables.
//!
//! This module handles loading RSI zones, the volume surge threshold, factor
//! weights, the catalyst boost and the sentiment decay settings.

use super::{FusionWeights, Lookup, ScorerKind, parse_f64};
use anyhow::Result;
use std::str::FromStr;

/// Fusion environment configuration
#[derive(Debug, Clone)]
pub struct FusionEnvConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_surge_threshold: f64,
    pub weights: FusionWeights,
    pub catalyst_boost: f64,
    pub sentiment_half_life_hours: f64,
    pub sentiment_scorer: ScorerKind,
}

impl FusionEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = FusionWeights::default();
        let weights = FusionWeights {
            macd: parse_f64(lookup, "WEIGHT_MACD", defaults.macd)?,
            rsi: parse_f64(lookup, "WEIGHT_RSI", defaults.rsi)?,
            volume: parse_f64(lookup, "WEIGHT_VOLUME", defaults.volume)?,
            momentum: parse_f64(lookup, "WEIGHT_MOMENTUM", defaults.momentum)?,
            sentiment: parse_f64(lookup, "WEIGHT_SENTIMENT", defaults.sentiment)?,
        };

        let sentiment_scorer = match lookup("SENTIMENT_SCORER") {
            Some(raw) => ScorerKind::from_str(raw.trim())?,
            None => ScorerKind::default(),
        };

        Ok(Self {
            rsi_oversold: parse_f64(lookup, "RSI_OVERSOLD", 30.0)?,
            rsi_overbought: parse_f64(lookup, "RSI_OVERBOUGHT", 70.0)?,
            volume_surge_threshold: parse_f64(lookup, "VOLUME_SURGE_THRESHOLD", 1.5)?,
            weights,
            catalyst_boost: parse_f64(lookup, "CATALYST_BOOST", 0.15)?,
            sentiment_half_life_hours: parse_f64(lookup, "SENTIMENT_HALF_LIFE_HOURS", 24.0)?,
            sentiment_scorer,
        })
    }
}
