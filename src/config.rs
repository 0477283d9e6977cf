// ⚙️ Configuration - environment (and optional .env) → typed settings
// Only the binary reads this; the pipeline receives a PipelineConfig.

use crate::error::Result;
use crate::parser::SourceType;
use crate::pipeline::PipelineConfig;
use crate::postgres::PostgresSink;
use crate::sink::{SqliteSink, TransactionSink, DEFAULT_TABLE};
use std::env;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// DATABASE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
    None,
}

impl DatabaseBackend {
    fn from_env(value: Option<String>) -> Self {
        match value
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "postgres" | "postgresql" => Self::Postgres,
            "sqlite" => Self::Sqlite,
            "none" | "off" => Self::None,
            other => {
                tracing::warn!(value = %other, "Unknown DATABASE_BACKEND, using postgres");
                Self::Postgres
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub schema: String,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub postgres: PostgresConfig,
    pub sqlite_path: PathBuf,
    pub table: String,
}

impl DatabaseConfig {
    /// The configured sink, or None when loading is switched off
    pub fn open_sink(&self) -> Result<Option<Box<dyn TransactionSink>>> {
        let sink: Box<dyn TransactionSink> = match self.backend {
            DatabaseBackend::None => return Ok(None),
            DatabaseBackend::Sqlite => {
                Box::new(SqliteSink::open(&self.sqlite_path)?.with_table(&self.table)?)
            }
            DatabaseBackend::Postgres => Box::new(PostgresSink::new(&self.postgres, &self.table)?),
        };
        Ok(Some(sink))
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    /// (source code, directory) in processing order
    pub sources: Vec<(String, PathBuf)>,
    pub output_path: PathBuf,
    pub taxonomy_path: Option<PathBuf>,
    pub database: DatabaseConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(env_opt)
    }

    /// Build from any key → value lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Self {
            sources: vec![
                (
                    SourceType::Barclays.code().to_string(),
                    PathBuf::from(get_or("BARCLAYS_DIR", "./data/barclays")),
                ),
                (
                    SourceType::Mbna.code().to_string(),
                    PathBuf::from(get_or("MBNA_DIR", "./data/mbna")),
                ),
            ],
            output_path: PathBuf::from(get_or(
                "COMBINED_FILE_PATH",
                "./data/financial_tracker.csv",
            )),
            taxonomy_path: get("TAXONOMY_PATH").map(PathBuf::from),
            database: DatabaseConfig {
                backend: DatabaseBackend::from_env(get("DATABASE_BACKEND")),
                postgres: PostgresConfig {
                    host: get_or("HOST", "localhost"),
                    port: get("POSTGRES_PORT")
                        .and_then(|raw| raw.parse().ok())
                        .unwrap_or(5432),
                    dbname: get_or("POSTGRES_DBNAME", "default_dbname"),
                    user: get_or("POSTGRES_USER", "default_user"),
                    password: get_or("POSTGRES_PASSWORD", "default_password"),
                    schema: get_or("POSTGRES_SCHEMA", "public"),
                },
                sqlite_path: PathBuf::from(get_or("SQLITE_PATH", "./data/financial_tracker.db")),
                table: get_or("DB_TABLE", DEFAULT_TABLE),
            },
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sources: self.sources.clone(),
            output_path: self.output_path.clone(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
