//! sigfuse - signal fusion and risk-managed decisions from the command line
//!
//! # Usage
//! ```sh
//! sigfuse evaluate --bars bars.csv --sentiment reddit.csv --out decisions.csv
//! sigfuse evaluate --bars bars.csv --format json --as-of 2025-06-02T21:00:00Z
//! sigfuse config --config sigfuse.toml
//! ```
//!
//! Configuration comes from `--config <file.toml>` when given, otherwise from
//! environment variables (a `.env` file is loaded first).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sigfuse::application::engine::DecisionEngine;
use sigfuse::application::evaluation_service::EvaluationService;
use sigfuse::config::Config;
use sigfuse::domain::ports::SentimentProvider;
use sigfuse::infrastructure::observability::{Metrics, MetricsReporter};
use sigfuse::infrastructure::{
    CsvPriceBarProvider, CsvSentimentProvider, DecisionExporter, ExportFormat,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Signal fusion and risk-managed decision engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate symbols from CSV inputs and export the decisions
    Evaluate {
        /// Price bars CSV (symbol,timestamp,open,high,low,close,volume)
        #[arg(long)]
        bars: PathBuf,

        /// Sentiment CSV (symbol,timestamp,source,text,score); repeatable
        #[arg(long)]
        sentiment: Vec<PathBuf>,

        /// Output file; decisions go to stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format; guessed from the output extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        as_of: Option<String>,

        /// Comma-separated symbols, overriding the configured universe
        #[arg(short, long)]
        symbols: Option<String>,

        /// Print a METRICS_JSON snapshot to stderr after the batch
        #[arg(long)]
        metrics: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_toml_file(path),
        None => Config::from_env().context("Failed to load configuration from environment"),
    }
}

fn parse_as_of(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --as-of timestamp: {}", raw))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[allow(clippy::too_many_arguments)]
async fn evaluate(
    bars: PathBuf,
    sentiment: Vec<PathBuf>,
    out: Option<PathBuf>,
    format: Option<ExportFormat>,
    config: Option<PathBuf>,
    as_of: Option<String>,
    symbols: Option<String>,
    emit_metrics: bool,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let as_of = parse_as_of(as_of.as_deref())?;

    let prices = CsvPriceBarProvider::from_path(&bars)?;
    let mut sources: Vec<Arc<dyn SentimentProvider>> = Vec::new();
    for path in &sentiment {
        sources.push(Arc::new(CsvSentimentProvider::from_path(path)?));
    }

    let symbols = match symbols {
        Some(raw) => parse_symbols(&raw),
        None if config.symbols.is_empty() => prices.symbols(),
        None => config.symbols.clone(),
    };
    info!("Evaluating {:?} as of {}", symbols, as_of);

    let metrics = Metrics::new()?;
    let reporter = emit_metrics.then(|| MetricsReporter::new(metrics.clone()));
    let engine = Arc::new(DecisionEngine::new(config)?.with_metrics(metrics));
    let service = EvaluationService::new(engine, Arc::new(prices), sources);
    let report = service.run(&symbols, as_of).await?;

    let format = format.unwrap_or_else(|| {
        out.as_deref()
            .map(ExportFormat::from_path)
            .unwrap_or_default()
    });
    match out {
        Some(path) => {
            DecisionExporter::write_to_path(&report, format, &path)?;
        }
        None => {
            let stdout = std::io::stdout();
            DecisionExporter::write(&report, format, stdout.lock())?;
        }
    }

    for (symbol, error) in report.failures() {
        warn!("{}: {}", symbol, error);
    }

    if let Some(reporter) = reporter {
        reporter.emit(&report);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr so exported decisions on stdout stay clean
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            bars,
            sentiment,
            out,
            format,
            config,
            as_of,
            symbols,
            metrics,
        } => {
            info!("sigfuse {} starting...", env!("CARGO_PKG_VERSION"));
            evaluate(bars, sentiment, out, format, config, as_of, symbols, metrics).await?;
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
