use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sigfuse::application::engine::{DecisionEngine, SymbolInput};
use sigfuse::application::evaluation_service::EvaluationService;
use sigfuse::config::{Config, IndicatorBackend};
use sigfuse::domain::decision::PositionAction;
use sigfuse::domain::errors::EngineError;
use sigfuse::domain::market::PriceBar;
use sigfuse::domain::ports::SentimentProvider;
use sigfuse::domain::sentiment::SentimentRecord;
use sigfuse::infrastructure::observability::Metrics;
use sigfuse::infrastructure::{
    InMemoryPriceBarProvider, InMemorySentimentProvider, UnavailableProvider,
};
use std::sync::Arc;

// --- Helpers ---

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 21, 0, 0).unwrap()
}

/// Daily bars ending one day before `as_of`.
fn bars(closes: &[f64], volume: f64) -> Vec<PriceBar> {
    let start = as_of() - Duration::days(closes.len() as i64);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let c = Decimal::from_f64(close).unwrap().round_dp(4);
            PriceBar::new(
                start + Duration::days(i as i64),
                c,
                (c * Decimal::new(101, 2)).round_dp(4),
                (c * Decimal::new(99, 2)).round_dp(4),
                c,
                Decimal::from_f64(volume).unwrap(),
            )
        })
        .collect()
}

/// Deterministic pseudo-random walk; `seed` picks the series.
fn walk(seed: u64, len: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut price = 50.0 + (seed % 50) as f64;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let step = ((state >> 33) % 2001) as f64 / 1000.0 - 1.0;
            price = (price * (1.0 + step * 0.03)).max(1.0);
            price
        })
        .collect()
}

fn record(symbol: &str, hours_ago: i64, score: f64) -> SentimentRecord {
    SentimentRecord::new(symbol, as_of() - Duration::hours(hours_ago), "reddit", "")
        .with_score(score)
}

// --- Many synthetic series ---

#[test]
fn decisions_stay_consistent_across_random_walks() {
    for backend in [IndicatorBackend::Native, IndicatorBackend::Ta] {
        let config = Config {
            indicator_backend: backend,
            ..Config::default()
        };
        let max_size = config.max_position_fraction;
        let engine = DecisionEngine::new(config).unwrap();

        for seed in 0..40u64 {
            let closes = walk(seed, 30 + (seed as usize % 50));
            let records = vec![
                record("TQQQ", 2, ((seed % 7) as f64 - 3.0) / 3.0),
                record("TQQQ", 30, 0.5),
            ];
            let decision = engine
                .evaluate("TQQQ", &bars(&closes, 1_000_000.0), &records, as_of())
                .unwrap();

            assert!((0.0..=1.0).contains(&decision.confidence));
            assert!((-1.0..=1.0).contains(&decision.raw_score));
            assert!(decision.position_size_fraction <= max_size);
            assert!(decision.position_size_fraction >= 0.0);
            assert_eq!(decision.generated_at, as_of());

            match decision.action {
                PositionAction::EnterLong => {
                    assert!(decision.classification.is_buy_side());
                    assert!(decision.stop_loss < decision.entry_price);
                    assert!(decision.entry_price < decision.take_profit);
                    assert!(decision.position_size_fraction > 0.0);
                }
                PositionAction::AvoidExit => {
                    assert!(decision.classification.is_sell_side());
                    assert_eq!(decision.position_size_fraction, 0.0);
                }
                PositionAction::StandAside => {
                    assert_eq!(decision.position_size_fraction, 0.0);
                }
                PositionAction::EnterShort => panic!("shorting is disabled by default"),
            }
        }
    }
}

#[test]
fn same_inputs_give_identical_decisions() {
    let engine = DecisionEngine::new(Config::default()).unwrap();
    let history = bars(&walk(7, 80), 2_000_000.0);
    let records = vec![record("SOXL", 1, 0.4), record("SOXL", 12, -0.2)];

    let first = engine.evaluate("SOXL", &history, &records, as_of()).unwrap();
    for _ in 0..5 {
        let again = engine.evaluate("SOXL", &history, &records, as_of()).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn short_history_is_degraded_hold() {
    let engine = DecisionEngine::new(Config::default()).unwrap();
    let history = bars(&walk(3, 8), 1_000_000.0);
    let decision = engine
        .evaluate("LABU", &history, &[record("LABU", 1, 1.0)], as_of())
        .unwrap();

    assert!(decision.degraded);
    assert_eq!(decision.confidence, 0.0);
    assert_eq!(decision.action, PositionAction::StandAside);
    assert_eq!(decision.entry_price, history.last().unwrap().close);
}

#[test]
fn batch_isolates_failures_and_keeps_order() {
    let engine = DecisionEngine::new(Config::default()).unwrap();
    let inputs = vec![
        SymbolInput::new("TQQQ", bars(&walk(1, 60), 1_000_000.0), vec![]),
        SymbolInput::new("EMPTY", vec![], vec![record("EMPTY", 1, 0.9)]),
        SymbolInput::new("SOXL", bars(&walk(2, 60), 1_000_000.0), vec![]),
    ];

    let report = engine.evaluate_batch(&inputs, as_of());
    let symbols: Vec<&str> = report.outcomes.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["TQQQ", "EMPTY", "SOXL"]);

    assert!(report.get("TQQQ").unwrap().result.is_ok());
    assert!(report.get("SOXL").unwrap().result.is_ok());
    assert!(matches!(
        report.get("EMPTY").unwrap().result,
        Err(EngineError::NoPriceData { .. })
    ));

    let summary = report.summary();
    assert_eq!(summary.symbols, 3);
    assert_eq!(summary.decisions, 2);
    assert_eq!(summary.failures, 1);
}

// --- Through the async service ---

#[tokio::test]
async fn service_treats_unavailable_sources_as_no_evidence() {
    let prices = InMemoryPriceBarProvider::new();
    prices.insert("TQQQ", bars(&walk(11, 60), 1_000_000.0)).await;
    prices.insert("SOXL", bars(&walk(12, 60), 1_000_000.0)).await;

    let metrics = Metrics::new().unwrap();
    let engine = Arc::new(
        DecisionEngine::new(Config::default())
            .unwrap()
            .with_metrics(metrics.clone()),
    );

    let sources: Vec<Arc<dyn SentimentProvider>> =
        vec![Arc::new(UnavailableProvider::new("twitter", "rate limited"))];
    let service = EvaluationService::new(Arc::clone(&engine), Arc::new(prices.clone()), sources);
    let report = service
        .run(&["TQQQ".to_string(), "SOXL".to_string()], as_of())
        .await
        .unwrap();

    assert_eq!(report.summary().decisions, 2);
    for decision in report.decisions() {
        assert_eq!(decision.sentiment_samples, 0);
        assert_eq!(decision.sentiment_score, 0.0);
    }
    assert!(
        metrics
            .render()
            .contains("sigfuse_upstream_unavailable_total{source=\"twitter\"} 2")
    );

    // Same bars without any sentiment source: identical verdicts
    let bare = EvaluationService::new(engine, Arc::new(prices), vec![]);
    let baseline = bare
        .run(&["TQQQ".to_string(), "SOXL".to_string()], as_of())
        .await
        .unwrap();
    let with_outage: Vec<_> = report.decisions().map(|d| d.classification).collect();
    let without: Vec<_> = baseline.decisions().map(|d| d.classification).collect();
    assert_eq!(with_outage, without);
}

#[tokio::test]
async fn service_merges_records_from_every_source() {
    let prices = InMemoryPriceBarProvider::new();
    prices.insert("TQQQ", bars(&walk(21, 60), 1_000_000.0)).await;

    let reddit = InMemorySentimentProvider::new("reddit", vec![record("TQQQ", 1, 0.8)]);
    let news = InMemorySentimentProvider::new(
        "news",
        vec![record("TQQQ", 3, 0.2), record("SOXL", 1, -0.9)],
    );
    let sources: Vec<Arc<dyn SentimentProvider>> = vec![Arc::new(reddit), Arc::new(news)];

    let engine = Arc::new(DecisionEngine::new(Config::default()).unwrap());
    let service = EvaluationService::new(engine, Arc::new(prices), sources);
    let report = service.run(&["TQQQ".to_string()], as_of()).await.unwrap();

    let decision = report.decisions().next().unwrap();
    assert_eq!(decision.sentiment_samples, 2);
    assert!(decision.sentiment_score > 0.2 && decision.sentiment_score < 0.8);
}

#[test]
fn catalyst_text_in_records_raises_score() {
    let engine = DecisionEngine::new(Config::default()).unwrap();
    let history = bars(&walk(7, 80), 2_000_000.0);
    let quiet = vec![
        SentimentRecord::new("LABU", as_of() - Duration::hours(2), "news", "quiet session")
            .with_score(0.0),
    ];
    let news = vec![
        SentimentRecord::new("LABU", as_of() - Duration::hours(2), "news", "FDA approval granted")
            .with_score(0.0),
    ];

    let plain = engine.evaluate("LABU", &history, &quiet, as_of()).unwrap();
    let boosted = engine.evaluate("LABU", &history, &news, as_of()).unwrap();

    assert!(!plain.reasons.iter().any(|r| r.starts_with("Catalyst")));
    assert!(boosted.reasons.iter().any(|r| r == "Catalyst news (1/1 records)"));
    assert!(boosted.raw_score >= plain.raw_score);
    if plain.raw_score < 0.85 {
        assert!((boosted.raw_score - plain.raw_score - 0.15).abs() < 1e-6);
    }
}
