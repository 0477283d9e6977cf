// 💾 Combined Output File - date,description,amount,type,category,subcategory
// Values are quoted only when they contain the delimiter (or a quote/newline).

use crate::error::{PipelineError, Result};
use crate::record::{Classification, FlowType, Transaction};
use crate::schema::{Column, SchemaValidator, POST_COLUMNS};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header row of the combined file
pub fn header() -> Vec<&'static str> {
    POST_COLUMNS.iter().map(|c| c.field()).collect()
}

/// Write the final record set, creating the parent directory if needed
pub fn write_combined(path: &Path, transactions: &[Transaction]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)?;

    writer.write_record(header())?;

    for tx in transactions {
        let classification = tx.classification.as_ref().ok_or_else(|| {
            PipelineError::schema("Expected column 'category' not found in record set")
        })?;

        writer.write_record([
            tx.date.format(DATE_FORMAT).to_string(),
            tx.description.clone(),
            tx.amount.to_string(),
            tx.flow_type.to_string(),
            classification.category.clone(),
            classification.subcategory.clone(),
        ])?;
    }

    writer.flush()?;
    tracing::info!(path = %path.display(), rows = transactions.len(), "Saved combined file");
    Ok(transactions.len())
}

/// Read a combined file back into records
pub fn read_combined(path: &Path) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let header_fields: Vec<&str> = headers.iter().collect();
    SchemaValidator::new().validate_header(&header_fields, POST_COLUMNS)?;

    let index = |column: Column| {
        header_fields
            .iter()
            .position(|h| h.trim() == column.field())
            .unwrap_or_default()
    };
    let date_idx = index(Column::Date);
    let desc_idx = index(Column::Description);
    let amount_idx = index(Column::Amount);
    let type_idx = index(Column::Type);
    let category_idx = index(Column::Category);
    let subcategory_idx = index(Column::Subcategory);

    let mut transactions = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let get = |idx: usize| record.get(idx).unwrap_or("");
        let parse_error = |column: Column, value: &str, reason: String| PipelineError::Parse {
            source_name: "combined file".to_string(),
            file: path.to_path_buf(),
            line,
            column: column.field().to_string(),
            value: value.to_string(),
            reason,
        };

        let raw_date = get(date_idx);
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|e| parse_error(Column::Date, raw_date, e.to_string()))?;

        let raw_amount = get(amount_idx);
        let amount = Decimal::from_str(raw_amount)
            .map_err(|e| parse_error(Column::Amount, raw_amount, e.to_string()))?;

        let raw_type = get(type_idx);
        let flow_type = FlowType::from_str(raw_type)
            .map_err(|e| parse_error(Column::Type, raw_type, e))?;

        transactions.push(Transaction {
            date,
            description: get(desc_idx).to_string(),
            amount,
            flow_type,
            classification: Some(Classification::new(get(category_idx), get(subcategory_idx))),
        });
    }

    Ok(transactions)
}
