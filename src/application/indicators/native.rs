use super::{BandsOutput, IndicatorEngine, IndicatorPeriods, MacdOutput};
use statrs::statistics::Statistics;

/// Self-computed indicators: Wilder-smoothed RSI, SMA-seeded EMAs for MACD,
/// population standard deviation for the Bollinger envelope.
#[derive(Debug, Clone)]
pub struct NativeIndicatorEngine {
    periods: IndicatorPeriods,
}

impl NativeIndicatorEngine {
    pub fn new(periods: IndicatorPeriods) -> Self {
        Self { periods }
    }
}

impl IndicatorEngine for NativeIndicatorEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn periods(&self) -> &IndicatorPeriods {
        &self.periods
    }

    fn rsi(&self, closes: &[f64]) -> Option<f64> {
        wilder_rsi(closes, self.periods.rsi)
    }

    fn macd(&self, closes: &[f64]) -> Option<MacdOutput> {
        let p = &self.periods;
        let fast = ema_series(closes, p.macd_fast)?;
        let slow = ema_series(closes, p.macd_slow)?;

        // fast starts at index macd_fast - 1, slow at macd_slow - 1
        let offset = p.macd_slow - p.macd_fast;
        let line: Vec<f64> = slow
            .iter()
            .enumerate()
            .map(|(i, s)| fast[i + offset] - s)
            .collect();

        let signal = ema_series(&line, p.macd_signal)?;
        if signal.len() < 2 {
            return None;
        }

        // signal[k] lines up with line[k + macd_signal - 1]
        let hist_at = |k: usize| line[k + p.macd_signal - 1] - signal[k];
        let last = signal.len() - 1;

        Some(MacdOutput {
            line: line[line.len() - 1],
            signal: signal[last],
            hist: hist_at(last),
            hist_prev: hist_at(last - 1),
        })
    }

    fn bollinger(&self, closes: &[f64]) -> Option<BandsOutput> {
        let window = tail(closes, self.periods.bollinger)?;
        let middle = window.iter().mean();
        let spread = window.iter().population_std_dev() * self.periods.bollinger_stddev;
        Some(BandsOutput {
            upper: middle + spread,
            middle,
            lower: middle - spread,
        })
    }

    fn volume_ma(&self, volumes: &[f64]) -> Option<f64> {
        let window = tail(volumes, self.periods.volume_ma)?;
        Some(window.iter().mean())
    }
}

fn tail(values: &[f64], len: usize) -> Option<&[f64]> {
    if len == 0 || values.len() < len {
        return None;
    }
    Some(&values[values.len() - len..])
}

/// Wilder's RSI: the first averages are simple means over `period` changes,
/// later ones are smoothed with `(prev * (period - 1) + current) / period`.
///
/// A flat series yields 50, a series without losses yields 100.
pub(crate) fn wilder_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let n = period as f64;
    let (mut avg_gain, mut avg_loss) = closes[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });
    avg_gain /= n;
    avg_loss /= n;

    for w in closes[period..].windows(2) {
        let change = w[1] - w[0];
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
    }

    let rsi = if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };
    Some(rsi.clamp(0.0, 100.0))
}

/// EMA values from index `period - 1` onwards, seeded with the SMA of the
/// first `period` inputs. Output length is `values.len() - period + 1`.
pub(crate) fn ema_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    for &v in &values[period..] {
        let prev = out[out.len() - 1];
        out.push((v - prev) * k + prev);
    }
    Some(out)
}
