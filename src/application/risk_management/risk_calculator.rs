use crate::config::Config;
use crate::domain::decision::{Classification, Decision, FusionResult, PositionAction};
use crate::domain::errors::EngineError;
use crate::domain::sentiment::AggregatedSentiment;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::info;

/// Risk parameters applied to every fused signal.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub partial_sell_fraction: f64,
    pub base_position_fraction: f64,
    pub min_position_fraction: f64,
    pub max_position_fraction: f64,
    pub allow_short: bool,
}

impl From<&Config> for RiskParams {
    fn from(config: &Config) -> Self {
        Self {
            stop_loss_pct: config.stop_loss_pct,
            take_profit_pct: config.take_profit_pct,
            partial_sell_fraction: config.partial_sell_fraction,
            base_position_fraction: config.base_position_fraction,
            min_position_fraction: config.min_position_fraction,
            max_position_fraction: config.max_position_fraction,
            allow_short: config.allow_short,
        }
    }
}

/// Turns a fusion verdict and an entry price into stop/target levels, a
/// partial-sell plan and a position size. Pure; no I/O.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    params: RiskParams,
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
}

impl RiskCalculator {
    pub fn new(params: RiskParams) -> Result<Self, EngineError> {
        let stop_loss_pct = Decimal::from_f64(params.stop_loss_pct).ok_or_else(|| {
            EngineError::invalid_config("stop_loss_pct", "not representable as a decimal")
        })?;
        let take_profit_pct = Decimal::from_f64(params.take_profit_pct).ok_or_else(|| {
            EngineError::invalid_config("take_profit_pct", "not representable as a decimal")
        })?;

        Ok(Self {
            params,
            stop_loss_pct,
            take_profit_pct,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        Self::new(RiskParams::from(config))
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    /// Reward-to-risk ratio of the configured levels.
    pub fn risk_reward_ratio(&self) -> f64 {
        if self.params.stop_loss_pct > 0.0 {
            self.params.take_profit_pct / self.params.stop_loss_pct
        } else {
            0.0
        }
    }

    /// Fraction of capital for a new position: `base * confidence`, bounded
    /// to `[min, max]`.
    pub fn position_size(&self, confidence: f64) -> f64 {
        let p = &self.params;
        (p.base_position_fraction * confidence.clamp(0.0, 1.0))
            .max(p.min_position_fraction)
            .min(p.max_position_fraction)
    }

    /// `entry * factor`, rounded four places past the entry's own precision.
    /// Falls back to the exact product when rounding would land on the entry
    /// or on zero, so stop and target always stay strictly apart from it.
    fn level(entry: Decimal, factor: Decimal) -> Decimal {
        let exact = entry * factor;
        let rounded = exact.round_dp(entry.scale().max(4) + 4);
        if rounded == entry || rounded <= Decimal::ZERO {
            exact.normalize()
        } else {
            rounded
        }
    }

    /// (stop_loss, take_profit) for a long position.
    fn long_levels(&self, entry: Decimal) -> (Decimal, Decimal) {
        (
            Self::level(entry, Decimal::ONE - self.stop_loss_pct),
            Self::level(entry, Decimal::ONE + self.take_profit_pct),
        )
    }

    /// (stop_loss, take_profit) for a short position: stop above, target below.
    fn short_levels(&self, entry: Decimal) -> (Decimal, Decimal) {
        (
            Self::level(entry, Decimal::ONE + self.stop_loss_pct),
            Self::level(entry, Decimal::ONE - self.take_profit_pct),
        )
    }

    pub fn apply(
        &self,
        symbol: &str,
        fusion: &FusionResult,
        sentiment: &AggregatedSentiment,
        entry_price: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        if entry_price <= Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                symbol: symbol.to_string(),
                reason: format!("entry price must be positive, got {}", entry_price),
            });
        }

        let mut reasons = fusion.reasons.clone();
        let classification = fusion.classification;

        let (action, (stop_loss, take_profit)) = match classification {
            Classification::Buy | Classification::StrongBuy => {
                (PositionAction::EnterLong, self.long_levels(entry_price))
            }
            Classification::Sell | Classification::StrongSell if self.params.allow_short => {
                (PositionAction::EnterShort, self.short_levels(entry_price))
            }
            Classification::Sell | Classification::StrongSell => {
                reasons.push("avoid/exit: shorting disabled".to_string());
                (PositionAction::AvoidExit, self.long_levels(entry_price))
            }
            Classification::Hold => (PositionAction::StandAside, self.long_levels(entry_price)),
        };

        let opens_position = matches!(
            action,
            PositionAction::EnterLong | PositionAction::EnterShort
        );
        let (position_size_fraction, partial_sell_fraction) = if opens_position {
            (
                self.position_size(fusion.confidence),
                self.params.partial_sell_fraction,
            )
        } else {
            (0.0, 0.0)
        };

        if opens_position {
            info!(
                "RiskCalculator: {} {} at {} -> size {:.1}%, stop {}, target {} (sell {:.0}% there)",
                symbol,
                action,
                entry_price,
                position_size_fraction * 100.0,
                stop_loss,
                take_profit,
                partial_sell_fraction * 100.0
            );
        }

        Ok(Decision {
            symbol: symbol.to_string(),
            classification,
            confidence: fusion.confidence.clamp(0.0, 1.0),
            raw_score: fusion.raw_score,
            entry_price,
            stop_loss,
            take_profit,
            partial_sell_fraction,
            partial_sell_price: take_profit,
            position_size_fraction,
            action,
            risk_reward_ratio: self.risk_reward_ratio(),
            sentiment_score: sentiment.mean_score,
            sentiment_samples: sentiment.sample_count,
            reasons,
            degraded: fusion.degraded,
            generated_at: as_of,
        })
    }
}
