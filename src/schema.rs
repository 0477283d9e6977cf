// 📐 Schema Gate - column presence and value checks before anything is persisted
// Never coerces: a bad record set aborts the run with a SchemaError.

use crate::error::{PipelineError, Result};
use crate::record::{FlowType, Transaction};
use std::fmt;

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Description,
    Amount,
    Type,
    Category,
    Subcategory,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Description => "Description",
            Column::Amount => "Amount",
            Column::Type => "Type",
            Column::Category => "Category",
            Column::Subcategory => "Subcategory",
        }
    }

    /// Header used in the combined output file and the database table
    pub fn field(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Description => "description",
            Column::Amount => "amount",
            Column::Type => "type",
            Column::Category => "category",
            Column::Subcategory => "subcategory",
        }
    }
}

/// After standardization
pub const PRE_COLUMNS: &[Column] = &[Column::Date, Column::Description, Column::Amount, Column::Type];

/// After classification and normalization
pub const POST_COLUMNS: &[Column] = &[
    Column::Date,
    Column::Description,
    Column::Amount,
    Column::Type,
    Column::Category,
    Column::Subcategory,
];

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub row: Option<usize>,
    pub column: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: '{}' {}", row, self.column, self.message),
            None => write!(f, "'{}' {}", self.column, self.message),
        }
    }
}

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

pub struct SchemaValidator {
    /// How many individual problems to spell out in the SchemaError
    pub max_reported: usize,
}

impl SchemaValidator {
    pub fn new() -> Self {
        SchemaValidator { max_reported: 5 }
    }

    /// Every problem in the record set for the given columns
    pub fn check(&self, transactions: &[Transaction], columns: &[Column]) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // A record set that never went through a stage lacks its columns
        // entirely; report that once instead of per row.
        for column in columns {
            let absent = matches!(column, Column::Category | Column::Subcategory)
                && transactions.iter().any(|tx| tx.classification.is_none());
            if absent {
                errors.push(ValidationError {
                    row: None,
                    column: column.name(),
                    message: "expected column not found".to_string(),
                });
            }
        }
        if !errors.is_empty() {
            return errors;
        }

        for (row, tx) in transactions.iter().enumerate() {
            for column in columns {
                match column {
                    Column::Date => {}
                    Column::Description => check_text(&mut errors, row, *column, &tx.description),
                    Column::Amount => {}
                    Column::Type => {
                        let expected = FlowType::from_amount(tx.amount);
                        if tx.flow_type != expected {
                            errors.push(ValidationError {
                                row: Some(row),
                                column: column.name(),
                                message: format!(
                                    "is {} but amount {} implies {}",
                                    tx.flow_type, tx.amount, expected
                                ),
                            });
                        }
                    }
                    Column::Category => {
                        if let Some(category) = tx.category() {
                            check_text(&mut errors, row, *column, category);
                        }
                    }
                    Column::Subcategory => {
                        if let Some(subcategory) = tx.subcategory() {
                            check_text(&mut errors, row, *column, subcategory);
                        }
                    }
                }
            }
        }

        errors
    }

    pub fn validate(&self, transactions: &[Transaction], columns: &[Column]) -> Result<()> {
        let errors = self.check(transactions, columns);
        if errors.is_empty() {
            return Ok(());
        }

        let shown: Vec<String> = errors
            .iter()
            .take(self.max_reported)
            .map(|e| e.to_string())
            .collect();
        let more = errors.len().saturating_sub(self.max_reported);
        let mut message = shown.join("; ");
        if more > 0 {
            message.push_str(&format!("; and {more} more"));
        }

        Err(PipelineError::schema(message))
    }

    /// Check a delimited file header carries every expected field name
    pub fn validate_header(&self, header: &[&str], columns: &[Column]) -> Result<()> {
        for column in columns {
            if !header.iter().any(|h| h.trim() == column.field()) {
                return Err(PipelineError::schema(format!(
                    "Expected column '{}' not found",
                    column.field()
                )));
            }
        }
        Ok(())
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_text(errors: &mut Vec<ValidationError>, row: usize, column: Column, value: &str) {
    let problem = if value.is_empty() {
        Some("is empty")
    } else if value.trim().is_empty() {
        Some("is whitespace only")
    } else if value.trim() == "nan" {
        Some("is the literal 'nan'")
    } else {
        None
    };

    if let Some(problem) = problem {
        errors.push(ValidationError {
            row: Some(row),
            column: column.name(),
            message: problem.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Classification;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn tx(description: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            description,
            Decimal::new(-499, 2),
        )
    }

    fn classified(description: &str) -> Transaction {
        tx(description).with_classification(Classification::new("Going Out", "Coffee"))
    }

    #[test]
    fn test_valid_pre_and_post() {
        let v = SchemaValidator::new();
        assert!(v.validate(&[tx("PRET A MANGER")], PRE_COLUMNS).is_ok());
        assert!(v.validate(&[classified("PRET A MANGER")], POST_COLUMNS).is_ok());
    }

    #[test]
    fn test_missing_category_column_fails_post_validation() {
        let v = SchemaValidator::new();
        let err = v.validate(&[tx("PRET A MANGER")], POST_COLUMNS).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("'Category' expected column not found"));
    }

    #[test]
    fn test_unclassified_sentinel_passes() {
        let v = SchemaValidator::new();
        let t = tx("MYSTERY SHOP").with_classification(Classification::unmatched());
        assert!(v.validate(&[t], POST_COLUMNS).is_ok());
    }

    #[test]
    fn test_rejects_blank_whitespace_and_nan() {
        let v = SchemaValidator::new();
        let errors = v.check(&[tx(""), tx("   "), tx("nan"), tx(" nan ")], PRE_COLUMNS);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.column == "Description"));
        assert_eq!(errors[0].row, Some(0));
        assert_eq!(errors[3].row, Some(3));
    }

    #[test]
    fn test_only_lowercase_nan_is_rejected() {
        let v = SchemaValidator::new();
        assert!(v.validate(&[tx("NAN"), tx("NaN"), tx("NAN NOODLE BAR")], PRE_COLUMNS).is_ok());
    }

    #[test]
    fn test_rejects_blank_category() {
        let v = SchemaValidator::new();
        let t = tx("SHOP").with_classification(Classification::new("", "Sub"));
        let err = v.validate(&[t], POST_COLUMNS).unwrap_err();
        assert!(err.to_string().contains("'Category' is empty"));
    }

    #[test]
    fn test_flow_type_must_match_sign() {
        let v = SchemaValidator::new();
        let mut t = tx("SHOP");
        t.flow_type = FlowType::Inflow;
        let errors = v.check(&[t], PRE_COLUMNS);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column, "Type");
    }

    #[test]
    fn test_error_message_is_capped() {
        let v = SchemaValidator { max_reported: 2 };
        let err = v
            .validate(&[tx(""), tx(""), tx(""), tx("")], PRE_COLUMNS)
            .unwrap_err();
        assert!(err.to_string().ends_with("and 2 more"));
    }

    #[test]
    fn test_validate_header() {
        let v = SchemaValidator::new();
        let full = ["date", "description", "amount", "type", "category", "subcategory"];
        assert!(v.validate_header(&full, POST_COLUMNS).is_ok());

        let missing = ["date", "description", "amount", "type", "subcategory"];
        let err = v.validate_header(&missing, POST_COLUMNS).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("'category'"));
    }
}
