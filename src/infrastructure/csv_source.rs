//! CSV-backed collaborators.
//!
//! Price file columns: `symbol,timestamp,open,high,low,close,volume`
//! Sentiment file columns: `symbol,timestamp,source,text,score` (`score` may be empty)
//!
//! Timestamps are RFC 3339. Rows that fail to parse are skipped with a
//! warning; the rest of the file is still used.

use crate::domain::market::PriceBar;
use crate::domain::ports::{Fetched, PriceBarProvider, SentimentProvider};
use crate::domain::sentiment::SentimentRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct BarRow {
    symbol: String,
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct SentimentRow {
    symbol: String,
    timestamp: DateTime<Utc>,
    source: String,
    #[serde(default)]
    text: String,
    score: Option<f64>,
}

/// Reads every row, skipping the ones that do not deserialize.
fn read_rows<T: DeserializeOwned, R: Read>(reader: R, label: &str) -> (Vec<T>, usize) {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (line, result) in rdr.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                // +2: header line and 1-based numbering
                warn!("Skipping {} row {}: {}", label, line + 2, e);
                skipped += 1;
            }
        }
    }
    (rows, skipped)
}

/// Bar history loaded once from a CSV file, grouped by symbol in file order.
#[derive(Debug, Clone, Default)]
pub struct CsvPriceBarProvider {
    bars: HashMap<String, Vec<PriceBar>>,
    skipped_rows: usize,
}

impl CsvPriceBarProvider {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open price file {}", path.display()))?;
        let provider = Self::from_reader(file);
        info!(
            "CsvPriceBarProvider: loaded {} symbols from {} ({} rows skipped)",
            provider.bars.len(),
            path.display(),
            provider.skipped_rows
        );
        Ok(provider)
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        let (rows, skipped_rows) = read_rows::<BarRow, _>(reader, "price");
        let mut bars: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for row in rows {
            bars.entry(row.symbol.trim().to_uppercase())
                .or_default()
                .push(PriceBar::new(
                    row.timestamp,
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.volume,
                ));
        }
        Self { bars, skipped_rows }
    }

    /// Symbols present in the file, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.bars.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

#[async_trait]
impl PriceBarProvider for CsvPriceBarProvider {
    async fn fetch_bars(&self, symbol: &str) -> Fetched<PriceBar> {
        Fetched::Data(
            self.bars
                .get(&symbol.to_uppercase())
                .cloned()
                .unwrap_or_default(),
        )
    }
}

/// Text records loaded once from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSentimentProvider {
    name: String,
    records: Vec<SentimentRecord>,
    skipped_rows: usize,
}

impl CsvSentimentProvider {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open sentiment file {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();
        let provider = Self::from_reader(&name, file);
        info!(
            "CsvSentimentProvider: loaded {} records from {} ({} rows skipped)",
            provider.records.len(),
            path.display(),
            provider.skipped_rows
        );
        Ok(provider)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> Self {
        let (rows, skipped_rows) = read_rows::<SentimentRow, _>(reader, "sentiment");
        let records = rows
            .into_iter()
            .map(|row| SentimentRecord {
                symbol: row.symbol.trim().to_uppercase(),
                timestamp: row.timestamp,
                source: row.source,
                text: row.text,
                precomputed_score: row.score,
            })
            .collect();
        Self {
            name: name.to_string(),
            records,
            skipped_rows,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

#[async_trait]
impl SentimentProvider for CsvSentimentProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_records(&self, symbol: &str) -> Fetched<SentimentRecord> {
        Fetched::Data(
            self.records
                .iter()
                .filter(|r| r.symbol.eq_ignore_ascii_case(symbol))
                .cloned()
                .collect(),
        )
    }
}
