// Financial Tracker - Core Library
// Bank exports → deduplicated, classified, normalized ledger (CSV + database)

pub mod error;
pub mod record;
pub mod taxonomy;
pub mod parser;
pub mod deduplication;
pub mod classifier;
pub mod normalizer;
pub mod schema;
pub mod output;
pub mod sink;
pub mod postgres;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use record::{Classification, FlowType, RawBatch, RawRow, Transaction, UNCLASSIFIED};
pub use taxonomy::{CategoryGroup, SubcategoryGroup, SuppressionRule, Taxonomy};
pub use parser::{
    BankParser, ColumnLayout, ParserRegistry, SourceType,
    load_directory, standardize_with,
    BarclaysParser, MbnaParser,
};
pub use deduplication::{DeduplicationEngine, DeduplicationOutcome, DuplicateMatch};
pub use classifier::{keyword_pattern, Classifier};
pub use normalizer::{NormalizationReport, Normalizer};
pub use schema::{Column, SchemaValidator, ValidationError, POST_COLUMNS, PRE_COLUMNS};
pub use output::{read_combined, write_combined};
pub use sink::{SqliteSink, TransactionSink};
pub use postgres::PostgresSink;
pub use config::{Config, DatabaseBackend, DatabaseConfig, PostgresConfig};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
