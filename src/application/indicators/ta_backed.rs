use super::{BandsOutput, IndicatorEngine, IndicatorPeriods, MacdOutput};
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};
use tracing::warn;

/// Indicators computed with the `ta` crate.
///
/// Each call replays the full series through freshly constructed indicators,
/// so the engine itself holds no per-symbol state and can be shared across
/// threads. Note that `ta`'s RSI smooths gains and losses with an EMA
/// (`2 / (n + 1)`) rather than Wilder's `1 / n`, so its readings run hotter
/// than [`super::NativeIndicatorEngine`] on trending series.
#[derive(Debug, Clone)]
pub struct TaIndicatorEngine {
    periods: IndicatorPeriods,
}

impl TaIndicatorEngine {
    pub fn new(periods: IndicatorPeriods) -> Self {
        Self { periods }
    }
}

impl IndicatorEngine for TaIndicatorEngine {
    fn name(&self) -> &'static str {
        "ta"
    }

    fn periods(&self) -> &IndicatorPeriods {
        &self.periods
    }

    fn rsi(&self, closes: &[f64]) -> Option<f64> {
        let mut rsi = RelativeStrengthIndex::new(self.periods.rsi)
            .map_err(|e| warn!("ta RSI rejected period {}: {:?}", self.periods.rsi, e))
            .ok()?;
        closes.iter().map(|&c| rsi.next(c)).last()
    }

    fn macd(&self, closes: &[f64]) -> Option<MacdOutput> {
        let p = &self.periods;
        let mut macd = MovingAverageConvergenceDivergence::new(p.macd_fast, p.macd_slow, p.macd_signal)
            .map_err(|e| warn!("ta MACD rejected periods: {:?}", e))
            .ok()?;

        let mut hist_prev = None;
        let mut last = None;
        for &close in closes {
            let out = macd.next(close);
            hist_prev = last.map(|prev: MacdOutput| prev.hist);
            last = Some(MacdOutput {
                line: out.macd,
                signal: out.signal,
                hist: out.histogram,
                hist_prev: 0.0,
            });
        }

        let mut last = last?;
        last.hist_prev = hist_prev?;
        Some(last)
    }

    fn bollinger(&self, closes: &[f64]) -> Option<BandsOutput> {
        let mut bb = BollingerBands::new(self.periods.bollinger, self.periods.bollinger_stddev)
            .map_err(|e| warn!("ta Bollinger rejected parameters: {:?}", e))
            .ok()?;
        let out = closes.iter().map(|&c| bb.next(c)).last()?;
        Some(BandsOutput {
            upper: out.upper,
            middle: out.average,
            lower: out.lower,
        })
    }

    fn volume_ma(&self, volumes: &[f64]) -> Option<f64> {
        let mut sma = SimpleMovingAverage::new(self.periods.volume_ma)
            .map_err(|e| warn!("ta SMA rejected period {}: {:?}", self.periods.volume_ma, e))
            .ok()?;
        volumes.iter().map(|&v| sma.next(v)).last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_period_yields_none() {
        let engine = TaIndicatorEngine::new(IndicatorPeriods {
            rsi: 0,
            volume_ma: 0,
            ..IndicatorPeriods::default()
        });
        assert!(engine.rsi(&[1.0, 2.0, 3.0]).is_none());
        assert!(engine.volume_ma(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_bollinger_matches_population_stddev() {
        let engine = TaIndicatorEngine::new(IndicatorPeriods {
            bollinger: 4,
            ..IndicatorPeriods::default()
        });
        let bands = engine.bollinger(&[100.0, 3.0, 3.0, 7.0, 7.0]).unwrap();
        assert!((bands.middle - 5.0).abs() < 1e-6);
        assert!((bands.upper - 9.0).abs() < 1e-6);
        assert!((bands.lower - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_macd_reports_previous_histogram() {
        let engine = TaIndicatorEngine::new(IndicatorPeriods::default());
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.4).sin() * 3.0).collect();
        let full = engine.macd(&closes).unwrap();
        let shorter = engine.macd(&closes[..39]).unwrap();
        assert!((full.hist_prev - shorter.hist).abs() < 1e-12);
    }
}
