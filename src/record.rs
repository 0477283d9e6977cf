// 🧾 Records - raw rows as read from a bank export, and the common Transaction schema

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Sentinel written for category/subcategory when no keyword matched
pub const UNCLASSIFIED: &str = "None";

// ============================================================================
// FLOW TYPE
// ============================================================================

/// Direction of money, derived only from the sign of the normalized amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    Outflow,
    Inflow,
}

impl FlowType {
    /// Negative = Outflow, zero and positive = Inflow
    pub fn from_amount(amount: Decimal) -> Self {
        if amount < Decimal::ZERO {
            FlowType::Outflow
        } else {
            FlowType::Inflow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Outflow => "Outflow",
            FlowType::Inflow => "Inflow",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Outflow" => Ok(FlowType::Outflow),
            "Inflow" => Ok(FlowType::Inflow),
            other => Err(format!("Unknown flow type: '{other}'")),
        }
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Classification {
    pub category: String,
    pub subcategory: String,
}

impl Classification {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Classification {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }

    /// The ("None", "None") pair
    pub fn unmatched() -> Self {
        Classification::new(UNCLASSIFIED, UNCLASSIFIED)
    }

    pub fn is_unmatched(&self) -> bool {
        self.category == UNCLASSIFIED && self.subcategory == UNCLASSIFIED
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// One financial movement in the common schema.
///
/// `classification` is `None` until the classifier has run; the
/// post-classification schema gate rejects records still missing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub flow_type: FlowType,
    pub classification: Option<Classification>,
}

impl Transaction {
    /// Build an unclassified record; flow type follows the amount's sign
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Decimal) -> Self {
        Transaction {
            date,
            description: description.into(),
            amount,
            flow_type: FlowType::from_amount(amount),
            classification: None,
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn category(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.category.as_str())
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.subcategory.as_str())
    }
}

// ============================================================================
// RAW ROWS (before standardization)
// ============================================================================

/// A row exactly as read, restricted to the source's declared columns.
/// Provenance (file, line) is kept for logging and is not part of equality
/// used by the deduplicator.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub values: Vec<String>,
    pub file: PathBuf,
    pub line: u64,
}

impl RawRow {
    pub fn new(values: Vec<String>, file: PathBuf, line: u64) -> Self {
        RawRow { values, file, line }
    }
}

/// All rows loaded from one source directory
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawBatch {
    pub fn new(columns: &[&str]) -> Self {
        RawBatch {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
