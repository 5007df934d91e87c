use chrono::{Duration, TimeZone, Utc};
use sigfuse::application::engine::DecisionEngine;
use sigfuse::application::evaluation_service::EvaluationService;
use sigfuse::config::Config;
use sigfuse::domain::ports::SentimentProvider;
use sigfuse::infrastructure::{
    CsvPriceBarProvider, CsvSentimentProvider, DecisionExporter, ExportFormat,
};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sigfuse-{}-{}", std::process::id(), name))
}

/// 60 identical daily bars for both symbols, so only sentiment tells them apart.
fn price_csv() -> String {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 21, 0, 0).unwrap();
    let mut out = String::from("symbol,timestamp,open,high,low,close,volume\n");
    for i in 0..60i64 {
        let ts = (start + Duration::days(i)).to_rfc3339();
        let close = if i % 2 == 0 { 50.4 } else { 49.6 };
        for symbol in ["TQQQ", "SOXL"] {
            writeln!(
                out,
                "{},{},{:.2},{:.2},{:.2},{:.2},1000000",
                symbol,
                ts,
                close,
                close + 1.0,
                close - 1.0,
                close
            )
            .unwrap();
        }
    }
    out.push_str("TQQQ,garbage,1,1,1,1,1\n");
    out
}

const SENTIMENT_CSV: &str = "\
symbol,timestamp,source,text,score
TQQQ,2025-04-29T18:00:00Z,reddit,,0.7
SOXL,2025-04-29T18:00:00Z,reddit,,-0.7
";

#[tokio::test]
async fn csv_inputs_flow_through_to_exported_rows() {
    let bars_path = temp_path("bars.csv");
    let sentiment_path = temp_path("reddit.csv");
    let out_path = temp_path("decisions.csv");
    let json_path = temp_path("decisions.json");
    std::fs::write(&bars_path, price_csv()).unwrap();
    std::fs::write(&sentiment_path, SENTIMENT_CSV).unwrap();

    let prices = CsvPriceBarProvider::from_path(&bars_path).unwrap();
    assert_eq!(prices.skipped_rows(), 1);
    let symbols = prices.symbols();
    assert_eq!(symbols, vec!["SOXL", "TQQQ"]);

    let reddit = CsvSentimentProvider::from_path(&sentiment_path).unwrap();
    assert!(reddit.name().ends_with("reddit"));
    let sources: Vec<Arc<dyn SentimentProvider>> = vec![Arc::new(reddit)];

    let engine = Arc::new(DecisionEngine::new(Config::default()).unwrap());
    let service = EvaluationService::new(engine, Arc::new(prices), sources);
    let as_of = Utc.with_ymd_and_hms(2025, 4, 30, 0, 0, 0).unwrap();
    let report = service.run(&symbols, as_of).await.unwrap();

    let tqqq = report.get("TQQQ").unwrap().result.as_ref().unwrap();
    let soxl = report.get("SOXL").unwrap().result.as_ref().unwrap();
    assert_eq!(tqqq.sentiment_samples, 1);
    assert_eq!(soxl.sentiment_samples, 1);
    // 2 * sentiment weight * 0.7
    assert!((tqqq.raw_score - soxl.raw_score - 0.28).abs() < 1e-6);

    let rows = DecisionExporter::write_to_path(&report, ExportFormat::Csv, &out_path).unwrap();
    assert_eq!(rows, 2);

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let symbol_col = headers.iter().position(|h| h == "symbol").unwrap();
    let size_col = headers
        .iter()
        .position(|h| h == "position_size_fraction")
        .unwrap();
    let exported: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(exported.len(), 2);
    assert_eq!(&exported[0][symbol_col], "SOXL");
    assert_eq!(&exported[1][symbol_col], "TQQQ");
    for row in &exported {
        let size: f64 = row[size_col].parse().unwrap();
        assert!((0.0..=0.25).contains(&size));
    }

    DecisionExporter::write_to_path(&report, ExportFormat::Json, &json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["decisions"], 2);
    assert_eq!(json["decisions"][1]["symbol"], "TQQQ");

    for path in [bars_path, sentiment_path, out_path, json_path] {
        let _ = std::fs::remove_file(path);
    }
}
