pub mod csv_source;
pub mod export;
pub mod mock;
pub mod observability;

pub use csv_source::{CsvPriceBarProvider, CsvSentimentProvider};
pub use export::{DecisionExporter, ExportFormat};
pub use mock::{InMemoryPriceBarProvider, InMemorySentimentProvider, UnavailableProvider};
