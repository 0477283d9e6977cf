// ⚠️ Pipeline Errors - every fatal failure a run can hit
// Duplicates and unmatched descriptions are NOT errors (they are logged)

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required column absent, wrong logical type, or a null/blank/"nan" value
    #[error("Schema error: {message}")]
    Schema { message: String },

    /// A date or amount cell that doesn't parse in the source's format
    #[error("Parse error in {source_name} file {} line {line}, column '{column}' = {value:?}: {reason}", file.display())]
    Parse {
        source_name: String,
        file: PathBuf,
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid taxonomy: {0}")]
    Taxonomy(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("No parser registered for source '{0}'")]
    UnknownSource(String),
}

impl PipelineError {
    pub fn schema(message: impl Into<String>) -> Self {
        PipelineError::Schema {
            message: message.into(),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, PipelineError::Schema { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, PipelineError::Parse { .. })
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::Database(e.to_string())
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        PipelineError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
