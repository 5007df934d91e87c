//! Signal fusion.
//!
//! Combines indicator state and aggregated sentiment into a single
//! classification. Each factor contributes a signed, weighted vote:
//! - MACD: histogram crossing zero between the last two bars
//! - RSI: oversold (bullish) or overbought (bearish) zone
//! - Volume: a surge amplifies whatever direction the other factors agree on
//! - Momentum: short and long windows pointing the same way
//! - Sentiment: weighted by the decayed mean score
//!
//! The sum is normalized by the total weight into [-1, 1]. A catalyst boost
//! (`catalyst_boost * catalyst share`) is then added on top, the result is
//! clamped again and mapped onto the classification bands. Missing factors
//! vote 0 and mark the result degraded.

use crate::config::{Config, FusionWeights};
use crate::domain::decision::{Classification, FactorContributions, FusionResult};
use crate::domain::market::IndicatorState;
use crate::domain::sentiment::AggregatedSentiment;
use tracing::debug;

/// Scores are snapped to this grid before banding.
const SCORE_PRECISION: f64 = 1e9;

#[derive(Debug, Clone)]
pub struct SignalFusion {
    weights: FusionWeights,
    rsi_oversold: f64,
    rsi_overbought: f64,
    volume_surge_threshold: f64,
    catalyst_boost: f64,
}

/// Direction of a MACD histogram zero cross on the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdCross {
    Bullish,
    Bearish,
    None,
}

impl MacdCross {
    /// Bullish when the histogram goes from `<= 0` to `> 0`, bearish for the
    /// reverse. A histogram that stays at zero is no cross.
    pub fn detect(hist_prev: f64, hist: f64) -> Self {
        if hist_prev <= 0.0 && hist > 0.0 {
            Self::Bullish
        } else if hist_prev >= 0.0 && hist < 0.0 {
            Self::Bearish
        } else {
            Self::None
        }
    }
}

impl SignalFusion {
    pub fn new(
        weights: FusionWeights,
        rsi_oversold: f64,
        rsi_overbought: f64,
        volume_surge_threshold: f64,
    ) -> Self {
        Self {
            weights,
            rsi_oversold,
            rsi_overbought,
            volume_surge_threshold,
            catalyst_boost: 0.0,
        }
    }

    /// Score added per unit of catalyst share.
    pub fn with_catalyst_boost(mut self, boost: f64) -> Self {
        self.catalyst_boost = boost;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.weights,
            config.rsi_oversold,
            config.rsi_overbought,
            config.volume_surge_threshold,
        )
        .with_catalyst_boost(config.catalyst_boost)
    }

    pub fn fuse(&self, state: &IndicatorState, sentiment: &AggregatedSentiment) -> FusionResult {
        let Some(rsi) = state.rsi else {
            debug!(
                "{}: only {} bars, no RSI; holding",
                state.symbol, state.bars_used
            );
            return FusionResult::neutral_degraded(format!(
                "Insufficient history ({} bars)",
                state.bars_used
            ));
        };

        let w = &self.weights;
        let mut contributions = FactorContributions::default();
        let mut reasons = Vec::new();
        let mut degraded = state.degraded;

        // MACD
        match (state.macd_hist_prev, state.macd_hist) {
            (Some(prev), Some(hist)) => match MacdCross::detect(prev, hist) {
                MacdCross::Bullish => {
                    contributions.macd = w.macd;
                    reasons.push("MACD bullish cross".to_string());
                }
                MacdCross::Bearish => {
                    contributions.macd = -w.macd;
                    reasons.push("MACD bearish cross".to_string());
                }
                MacdCross::None => {}
            },
            _ => degraded = true,
        }

        // RSI
        if rsi < self.rsi_oversold {
            contributions.rsi = w.rsi;
            reasons.push(format!("RSI oversold ({:.1})", rsi));
        } else if rsi > self.rsi_overbought {
            contributions.rsi = -w.rsi;
            reasons.push(format!("RSI overbought ({:.1})", rsi));
        }

        // Momentum
        match (state.momentum_5d, state.momentum_20d) {
            (Some(short), Some(long)) => {
                if short > 0.0 && long > 0.0 {
                    contributions.momentum = w.momentum;
                    reasons.push("Momentum positive".to_string());
                } else if short < 0.0 && long < 0.0 {
                    contributions.momentum = -w.momentum;
                    reasons.push("Momentum negative".to_string());
                }
            }
            _ => degraded = true,
        }

        // Sentiment
        if sentiment.has_samples() {
            contributions.sentiment = w.sentiment * sentiment.mean_score;
            if sentiment.mean_score != 0.0 {
                reasons.push(format!(
                    "Sentiment {:+.2} ({} samples)",
                    sentiment.mean_score, sentiment.sample_count
                ));
            }
        }

        // Volume
        match state.volume_ratio {
            Some(ratio) if ratio >= self.volume_surge_threshold => {
                let direction = contributions.total();
                if direction != 0.0 {
                    let strength = (ratio / self.volume_surge_threshold).min(1.0);
                    contributions.volume = w.volume * strength * direction.signum();
                    reasons.push(format!("Volume surge {:.1}x", ratio));
                }
            }
            Some(_) => {}
            None => degraded = true,
        }

        // Catalyst
        if sentiment.catalyst_hits > 0 && self.catalyst_boost > 0.0 {
            contributions.catalyst = self.catalyst_boost * sentiment.catalyst_score.clamp(0.0, 1.0);
            reasons.push(format!(
                "Catalyst news ({}/{} records)",
                sentiment.catalyst_hits, sentiment.sample_count
            ));
        }

        let score = self.normalize(contributions.total(), contributions.catalyst);
        let classification = Classification::from_score(score);
        let confidence = score.abs().min(1.0);

        debug!(
            "{}: fused score {:.3} -> {} (macd={:.2}, rsi={:.2}, volume={:.2}, momentum={:.2}, sentiment={:.2}, catalyst={:.2}, degraded={})",
            state.symbol,
            score,
            classification,
            contributions.macd,
            contributions.rsi,
            contributions.volume,
            contributions.momentum,
            contributions.sentiment,
            contributions.catalyst,
            degraded
        );

        FusionResult {
            classification,
            confidence,
            raw_score: score,
            contributions,
            reasons,
            degraded,
        }
    }

    fn normalize(&self, raw: f64, boost: f64) -> f64 {
        let total = self.weights.total();
        if total <= 0.0 || !raw.is_finite() {
            return 0.0;
        }
        let boost = if boost.is_finite() { boost } else { 0.0 };
        let s = ((raw / total).clamp(-1.0, 1.0) + boost).clamp(-1.0, 1.0);
        (s * SCORE_PRECISION).round() / SCORE_PRECISION
    }
}
