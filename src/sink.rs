// 🗄️ Transaction Sinks - destructive replace of the reporting table
// Every run drops the table, recreates it and inserts the full record set
// inside one database transaction.

use crate::error::{PipelineError, Result};
use crate::record::Transaction;
use rusqlite::{params, Connection};
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;

pub const DEFAULT_TABLE: &str = "financial_tracker";

/// A relational destination for the final record set
pub trait TransactionSink {
    /// Short name used in logs ("sqlite", "postgres")
    fn name(&self) -> &str;

    /// Replace everything in the destination table with `transactions`.
    /// Returns the number of rows inserted.
    fn replace_all(&mut self, transactions: &[Transaction]) -> Result<usize>;
}

/// Table and schema names are interpolated into DDL, so only plain
/// identifiers are accepted
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest {
        Ok(name)
    } else {
        Err(PipelineError::Database(format!(
            "Invalid identifier {name:?}: use letters, digits and underscores"
        )))
    }
}

/// Amounts are stored as floating point in the reporting table
pub(crate) fn amount_as_f64(tx: &Transaction) -> Result<f64> {
    tx.amount.to_f64().ok_or_else(|| {
        PipelineError::Database(format!("Amount {} does not fit a FLOAT column", tx.amount))
    })
}

// ============================================================================
// SQLITE
// ============================================================================

pub struct SqliteSink {
    conn: Connection,
    table: String,
}

impl SqliteSink {
    /// Open (or create) a database file; WAL mode like any other writer here
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(SqliteSink::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(SqliteSink::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteSink {
            conn,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_table(mut self, table: &str) -> Result<Self> {
        self.table = validate_identifier(table)?.to_string();
        Ok(self)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn row_count(&self) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl TransactionSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn replace_all(&mut self, transactions: &[Transaction]) -> Result<usize> {
        let table = self.table.clone();
        let db_tx = self.conn.transaction()?;

        db_tx.execute(&format!("DROP TABLE IF EXISTS \"{table}\""), [])?;
        db_tx.execute(
            &format!(
                "CREATE TABLE \"{table}\" (
                    date DATE,
                    description TEXT,
                    amount FLOAT,
                    type TEXT,
                    category TEXT,
                    subcategory TEXT
                )"
            ),
            [],
        )?;

        {
            let mut stmt = db_tx.prepare(&format!(
                "INSERT INTO \"{table}\" (date, description, amount, type, category, subcategory)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ))?;

            for tx in transactions {
                stmt.execute(params![
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.description,
                    amount_as_f64(tx)?,
                    tx.flow_type.as_str(),
                    tx.category(),
                    tx.subcategory(),
                ])?;
            }
        }

        db_tx.commit()?;

        tracing::info!(sink = "sqlite", table = %table, rows = transactions.len(), "Loaded table");
        Ok(transactions.len())
    }
}
