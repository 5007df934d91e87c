// Stop/target levels and position sizing
pub mod risk_calculator;

pub use risk_calculator::{RiskCalculator, RiskParams};
