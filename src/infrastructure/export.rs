use crate::application::engine::{BatchReport, BatchSummary};
use crate::domain::decision::{Classification, Decision, PositionAction};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// Guesses the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

/// One flat CSV row per decision
#[derive(Debug, Serialize)]
struct DecisionRow<'a> {
    symbol: &'a str,
    classification: Classification,
    confidence: f64,
    raw_score: f64,
    action: PositionAction,
    entry_price: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
    partial_sell_fraction: f64,
    partial_sell_price: Decimal,
    position_size_fraction: f64,
    risk_reward_ratio: f64,
    sentiment_score: f64,
    sentiment_samples: usize,
    degraded: bool,
    reasons: String,
    generated_at: DateTime<Utc>,
}

impl<'a> From<&'a Decision> for DecisionRow<'a> {
    fn from(d: &'a Decision) -> Self {
        Self {
            symbol: &d.symbol,
            classification: d.classification,
            confidence: d.confidence,
            raw_score: d.raw_score,
            action: d.action,
            entry_price: d.entry_price,
            stop_loss: d.stop_loss,
            take_profit: d.take_profit,
            partial_sell_fraction: d.partial_sell_fraction,
            partial_sell_price: d.partial_sell_price,
            position_size_fraction: d.position_size_fraction,
            risk_reward_ratio: d.risk_reward_ratio,
            sentiment_score: d.sentiment_score,
            sentiment_samples: d.sentiment_samples,
            degraded: d.degraded,
            reasons: d.reasons.join("; "),
            generated_at: d.generated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct FailureEntry<'a> {
    symbol: &'a str,
    error: String,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    as_of: DateTime<Utc>,
    summary: BatchSummary,
    decisions: Vec<&'a Decision>,
    failures: Vec<FailureEntry<'a>>,
}

/// Writes batch results as CSV rows or a JSON document.
pub struct DecisionExporter;

impl DecisionExporter {
    /// One row per decision; symbols that failed are not written.
    pub fn write_csv<W: Write>(report: &BatchReport, writer: W) -> Result<usize> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);

        let mut rows = 0;
        for decision in report.decisions() {
            wtr.serialize(DecisionRow::from(decision))
                .with_context(|| format!("Failed to serialize decision for {}", decision.symbol))?;
            rows += 1;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(rows)
    }

    /// The whole report, failures included.
    pub fn write_json<W: Write>(report: &BatchReport, writer: W) -> Result<usize> {
        let decisions: Vec<&Decision> = report.decisions().collect();
        let rows = decisions.len();
        let doc = JsonReport {
            as_of: report.as_of,
            summary: report.summary(),
            decisions,
            failures: report
                .failures()
                .map(|(symbol, e)| FailureEntry {
                    symbol,
                    error: e.to_string(),
                })
                .collect(),
        };
        serde_json::to_writer_pretty(writer, &doc).context("Failed to serialize report")?;
        Ok(rows)
    }

    pub fn write<W: Write>(report: &BatchReport, format: ExportFormat, writer: W) -> Result<usize> {
        match format {
            ExportFormat::Csv => Self::write_csv(report, writer),
            ExportFormat::Json => Self::write_json(report, writer),
        }
    }

    pub fn write_to_path(report: &BatchReport, format: ExportFormat, path: &Path) -> Result<usize> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let rows = Self::write(report, format, &mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            "DecisionExporter: wrote {} decisions to {}",
            rows,
            path.display()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::SymbolOutcome;
    use crate::domain::errors::EngineError;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn report() -> BatchReport {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 2, 21, 0, 0).unwrap();
        let decision = Decision {
            symbol: "TQQQ".to_string(),
            classification: Classification::Buy,
            confidence: 0.42,
            raw_score: 0.42,
            entry_price: dec!(100),
            stop_loss: dec!(92),
            take_profit: dec!(120),
            partial_sell_fraction: 0.5,
            partial_sell_price: dec!(120),
            position_size_fraction: 0.084,
            action: PositionAction::EnterLong,
            risk_reward_ratio: 2.5,
            sentiment_score: 0.3,
            sentiment_samples: 4,
            reasons: vec!["RSI oversold (25.0)".to_string(), "Momentum positive".to_string()],
            degraded: false,
            generated_at: as_of,
        };
        BatchReport {
            as_of,
            outcomes: vec![
                SymbolOutcome {
                    symbol: "TQQQ".to_string(),
                    result: Ok(decision),
                },
                SymbolOutcome {
                    symbol: "SOXL".to_string(),
                    result: Err(EngineError::NoPriceData {
                        symbol: "SOXL".to_string(),
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_csv_one_row_per_decision() {
        let mut buf = Vec::new();
        let rows = DecisionExporter::write_csv(&report(), &mut buf).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("symbol,classification,confidence"));
        assert!(lines[1].starts_with("TQQQ,BUY,0.42"));
        assert!(lines[1].contains("ENTER_LONG"));
        assert!(lines[1].contains("RSI oversold (25.0); Momentum positive"));
    }

    #[test]
    fn test_json_includes_failures() {
        let mut buf = Vec::new();
        DecisionExporter::write_json(&report(), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["decisions"].as_array().unwrap().len(), 1);
        assert_eq!(value["decisions"][0]["classification"], "BUY");
        assert_eq!(value["failures"][0]["symbol"], "SOXL");
        assert_eq!(value["summary"]["failures"], 1);
        assert_eq!(value["summary"]["by_classification"]["BUY"], 1);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Csv);
    }
}
