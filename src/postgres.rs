// 🐘 Postgres Sink - same destructive replace as SQLite, against a server
// The rest of the pipeline is synchronous, so the sink owns a small
// current-thread runtime and blocks on each load.

use crate::config::PostgresConfig;
use crate::error::{PipelineError, Result};
use crate::record::Transaction;
use crate::sink::{amount_as_f64, validate_identifier, TransactionSink};
use chrono::NaiveDate;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, Postgres, QueryBuilder};

/// Rows per INSERT statement
pub const PAGE_SIZE: usize = 100;

/// `"schema"."table"` with both parts checked
pub fn qualified_table(schema: &str, table: &str) -> Result<String> {
    Ok(format!(
        "\"{}\".\"{}\"",
        validate_identifier(schema)?,
        validate_identifier(table)?
    ))
}

/// Dependent views go with the table; they are rebuilt outside this tool
pub fn drop_table_sql(target: &str) -> String {
    format!("DROP TABLE IF EXISTS {target} CASCADE")
}

pub fn create_table_sql(target: &str) -> String {
    format!(
        "CREATE TABLE {target} (
            date DATE,
            description TEXT,
            amount FLOAT,
            type TEXT,
            category TEXT,
            subcategory TEXT
        )"
    )
}

struct RowValues {
    date: NaiveDate,
    description: String,
    amount: f64,
    flow_type: &'static str,
    category: Option<String>,
    subcategory: Option<String>,
}

pub struct PostgresSink {
    options: PgConnectOptions,
    target: String,
    runtime: tokio::runtime::Runtime,
}

impl PostgresSink {
    pub fn new(config: &PostgresConfig, table: &str) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(PostgresSink {
            options,
            target: qualified_table(&config.schema, table)?,
            runtime,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    async fn replace_async(&self, rows: Vec<RowValues>) -> Result<usize> {
        let mut conn = self.options.connect().await?;
        let mut db_tx = conn.begin().await?;

        sqlx::query(&drop_table_sql(&self.target))
            .execute(&mut *db_tx)
            .await?;
        sqlx::query(&create_table_sql(&self.target))
            .execute(&mut *db_tx)
            .await?;

        let total = rows.len();
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let page: Vec<RowValues> = rows.by_ref().take(PAGE_SIZE).collect();

            let mut query = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {} (date, description, amount, type, category, subcategory) ",
                self.target
            ));
            query.push_values(page, |mut row, values| {
                row.push_bind(values.date)
                    .push_bind(values.description)
                    .push_bind(values.amount)
                    .push_bind(values.flow_type)
                    .push_bind(values.category)
                    .push_bind(values.subcategory);
            });
            query.build().execute(&mut *db_tx).await?;
        }

        db_tx.commit().await?;
        conn.close().await?;
        Ok(total)
    }
}

impl TransactionSink for PostgresSink {
    fn name(&self) -> &str {
        "postgres"
    }

    fn replace_all(&mut self, transactions: &[Transaction]) -> Result<usize> {
        let rows = transactions
            .iter()
            .map(|tx| {
                Ok(RowValues {
                    date: tx.date,
                    description: tx.description.clone(),
                    amount: amount_as_f64(tx)?,
                    flow_type: tx.flow_type.as_str(),
                    category: tx.category().map(str::to_string),
                    subcategory: tx.subcategory().map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let inserted = self
            .runtime
            .block_on(self.replace_async(rows))
            .map_err(|e| match e {
                PipelineError::Database(msg) => {
                    PipelineError::Database(format!("{}: {msg}", self.target))
                }
                other => other,
            })?;

        tracing::info!(sink = "postgres", table = %self.target, rows = inserted, "Loaded table");
        Ok(inserted)
    }
}
