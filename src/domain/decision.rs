use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrongSell => write!(f, "STRONG_SELL"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
            Self::Buy => write!(f, "BUY"),
            Self::StrongBuy => write!(f, "STRONG_BUY"),
        }
    }
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Self::StrongSell,
        Self::Sell,
        Self::Hold,
        Self::Buy,
        Self::StrongBuy,
    ];

    /// Maps a normalized score in [-1, 1] onto the five bands.
    ///
    /// The HOLD band is open on both sides: -0.2 is already SELL and 0.2 is
    /// already BUY.
    pub fn from_score(score: f64) -> Self {
        if score <= -0.6 {
            Self::StrongSell
        } else if score <= -0.2 {
            Self::Sell
        } else if score < 0.2 {
            Self::Hold
        } else if score < 0.6 {
            Self::Buy
        } else {
            Self::StrongBuy
        }
    }

    pub fn is_buy_side(&self) -> bool {
        matches!(self, Self::Buy | Self::StrongBuy)
    }

    pub fn is_sell_side(&self) -> bool {
        matches!(self, Self::Sell | Self::StrongSell)
    }

    /// Signed strength, -2 (strong sell) ..= 2 (strong buy)
    pub fn rank(&self) -> i8 {
        match self {
            Self::StrongSell => -2,
            Self::Sell => -1,
            Self::Hold => 0,
            Self::Buy => 1,
            Self::StrongBuy => 2,
        }
    }
}

/// What the risk stage recommends doing with the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionAction {
    EnterLong,
    EnterShort,
    /// Bearish view while shorting is disabled: stay out, or exit if held
    AvoidExit,
    StandAside,
}

impl fmt::Display for PositionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnterLong => write!(f, "ENTER_LONG"),
            Self::EnterShort => write!(f, "ENTER_SHORT"),
            Self::AvoidExit => write!(f, "AVOID_EXIT"),
            Self::StandAside => write!(f, "STAND_ASIDE"),
        }
    }
}

/// Weighted contribution of each evidence factor to the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorContributions {
    pub macd: f64,
    pub rsi: f64,
    pub volume: f64,
    pub momentum: f64,
    pub sentiment: f64,
    /// Additive catalyst boost, applied after weight normalization and so
    /// left out of [`FactorContributions::total`]
    #[serde(default)]
    pub catalyst: f64,
}

impl FactorContributions {
    pub fn total(&self) -> f64 {
        self.macd + self.rsi + self.volume + self.momentum + self.sentiment
    }
}

/// Output of signal fusion, before risk parameters are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub classification: Classification,
    pub confidence: f64,
    /// Normalized score in [-1, 1]
    pub raw_score: f64,
    pub contributions: FactorContributions,
    pub reasons: Vec<String>,
    pub degraded: bool,
}

impl FusionResult {
    /// Verdict used when there is not enough evidence to say anything.
    pub fn neutral_degraded(reason: impl Into<String>) -> Self {
        Self {
            classification: Classification::Hold,
            confidence: 0.0,
            raw_score: 0.0,
            contributions: FactorContributions::default(),
            reasons: vec![reason.into()],
            degraded: true,
        }
    }
}

/// Final, risk-managed trading decision for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub classification: Classification,
    pub confidence: f64,
    pub raw_score: f64,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub partial_sell_fraction: f64,
    /// Price at which `partial_sell_fraction` of the position is sold
    pub partial_sell_price: Decimal,
    pub position_size_fraction: f64,
    pub action: PositionAction,
    pub risk_reward_ratio: f64,
    pub sentiment_score: f64,
    pub sentiment_samples: usize,
    pub reasons: Vec<String>,
    pub degraded: bool,
    pub generated_at: DateTime<Utc>,
}
