//! Risk management configuration parsing from environment variables.
//!
//! This module handles loading stop/target levels, partial sells, position
//! sizing bounds, the short-selling switch and the symbol universe.

use super::{Lookup, parse_bool, parse_f64, parse_usize};
use anyhow::Result;

/// Risk management environment configuration
#[derive(Debug, Clone)]
pub struct RiskEnvConfig {
    // Levels
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub partial_sell_fraction: f64,

    // Position Sizing
    pub base_position_fraction: f64,
    pub min_position_fraction: f64,
    pub max_position_fraction: f64,
    pub allow_short: bool,

    // Universe
    pub symbols: Vec<String>,
    pub max_concurrent_fetches: usize,
}

impl RiskEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let symbols_str = lookup("SYMBOLS").unwrap_or_else(|| "TQQQ,SOXL,LABU".to_string());
        let symbols: Vec<String> = if symbols_str.trim().is_empty() {
            vec![]
        } else {
            symbols_str
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .collect()
        };

        Ok(Self {
            stop_loss_pct: parse_f64(lookup, "STOP_LOSS_PCT", 0.08)?,
            take_profit_pct: parse_f64(lookup, "TAKE_PROFIT_PCT", 0.20)?,
            partial_sell_fraction: parse_f64(lookup, "PARTIAL_SELL_FRACTION", 0.5)?,
            base_position_fraction: parse_f64(lookup, "BASE_POSITION_FRACTION", 0.20)?,
            min_position_fraction: parse_f64(lookup, "MIN_POSITION_FRACTION", 0.02)?,
            max_position_fraction: parse_f64(lookup, "MAX_POSITION_FRACTION", 0.25)?,
            allow_short: parse_bool(lookup, "ALLOW_SHORT", false)?,
            symbols,
            max_concurrent_fetches: parse_usize(lookup, "MAX_CONCURRENT_FETCHES", 4)?,
        })
    }
}
