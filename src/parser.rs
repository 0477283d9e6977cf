// 🏗️ Parser Framework - one adapter per bank export format
// load (directory → raw rows) and standardize (raw rows → Transaction)

use crate::error::{PipelineError, Result};
use crate::record::{RawBatch, RawRow, Transaction};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceType - which institution an export comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Barclays,
    Mbna,
}

impl SourceType {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Barclays => "Barclays",
            SourceType::Mbna => "MBNA",
        }
    }

    /// Registry key, also the name used in configuration
    pub fn code(&self) -> &'static str {
        match self {
            SourceType::Barclays => "barclays",
            SourceType::Mbna => "mbna",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "barclays" => Ok(SourceType::Barclays),
            "mbna" => Ok(SourceType::Mbna),
            other => Err(PipelineError::UnknownSource(other.to_string())),
        }
    }
}

/// Where each common field lives in a source's export, plus its cleaning rules
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub date: &'static str,
    pub description: &'static str,
    pub amount: &'static str,
    pub date_format: &'static str,
    /// Source reports money out as positive; flip to negative = money out
    pub negate_amounts: bool,
    /// Export appends tab-separated junk to the description
    pub truncate_at_tab: bool,
}

// ============================================================================
// ADAPTER TRAIT
// ============================================================================

/// BankParser - the capability every source adapter provides.
///
/// Adding a bank means implementing this trait and registering it in a
/// `ParserRegistry`; nothing downstream of standardize changes.
pub trait BankParser: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Every column of the export, in the order the bank documents them.
    /// Duplicate detection compares rows across all of these.
    fn columns(&self) -> &'static [&'static str];

    fn layout(&self) -> ColumnLayout;

    fn file_extension(&self) -> &str {
        "csv"
    }

    /// Read every matching file in `dir` into one batch
    fn load(&self, dir: &Path) -> Result<RawBatch> {
        load_directory(dir, self.file_extension(), self.columns(), self.source_type())
    }

    /// Drop source-only columns, parse, fix the sign, derive flow type
    fn standardize(&self, batch: RawBatch) -> Result<Vec<Transaction>> {
        standardize_with(self.source_type(), &self.layout(), batch)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Source name → adapter
pub struct ParserRegistry {
    parsers: BTreeMap<String, Box<dyn BankParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        ParserRegistry {
            parsers: BTreeMap::new(),
        }
    }

    /// Barclays and MBNA registered under their codes
    pub fn with_defaults() -> Self {
        let mut registry = ParserRegistry::new();
        registry.register(SourceType::Barclays.code(), Box::new(BarclaysParser::new()));
        registry.register(SourceType::Mbna.code(), Box::new(MbnaParser::new()));
        registry
    }

    pub fn register(&mut self, name: &str, parser: Box<dyn BankParser>) {
        self.parsers.insert(name.to_lowercase(), parser);
    }

    pub fn get(&self, name: &str) -> Result<&dyn BankParser> {
        self.parsers
            .get(&name.to_lowercase())
            .map(|p| p.as_ref())
            .ok_or_else(|| PipelineError::UnknownSource(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(|k| k.as_str())
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// BARCLAYS
// ============================================================================

/// Barclays current account export
///
/// Format: Number,Date,Account,Amount,Subcategory,Memo
/// Example: ,14/03/2024,20-00-00 12345678,-23.45,PAYMENT,TESCO STORES 3021\tON 13 MAR BCC
pub struct BarclaysParser;

impl BarclaysParser {
    pub const COLUMNS: &'static [&'static str] =
        &["Number", "Date", "Account", "Amount", "Subcategory", "Memo"];

    /// Native convention is already negative = money out
    pub const NEGATE_AMOUNTS: bool = false;

    pub const DATE_FORMAT: &'static str = "%d/%m/%Y";

    pub fn new() -> Self {
        BarclaysParser
    }
}

impl Default for BarclaysParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for BarclaysParser {
    fn source_type(&self) -> SourceType {
        SourceType::Barclays
    }

    fn columns(&self) -> &'static [&'static str] {
        Self::COLUMNS
    }

    fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            date: "Date",
            description: "Memo",
            amount: "Amount",
            date_format: Self::DATE_FORMAT,
            negate_amounts: Self::NEGATE_AMOUNTS,
            truncate_at_tab: true,
        }
    }
}

// ============================================================================
// MBNA
// ============================================================================

/// MBNA credit card export
///
/// Format: Date,Date entered,Reference,Description,Amount
/// Example: 12/03/2024,13/03/2024,24492154072000123456789,AMAZON.CO.UK,12.99
pub struct MbnaParser;

impl MbnaParser {
    pub const COLUMNS: &'static [&'static str] =
        &["Date", "Date entered", "Reference", "Description", "Amount"];

    /// Card statement: purchases are positive, repayments negative
    pub const NEGATE_AMOUNTS: bool = true;

    pub const DATE_FORMAT: &'static str = "%d/%m/%Y";

    pub fn new() -> Self {
        MbnaParser
    }
}

impl Default for MbnaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for MbnaParser {
    fn source_type(&self) -> SourceType {
        SourceType::Mbna
    }

    fn columns(&self) -> &'static [&'static str] {
        Self::COLUMNS
    }

    fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            date: "Date",
            description: "Description",
            amount: "Amount",
            date_format: Self::DATE_FORMAT,
            negate_amounts: Self::NEGATE_AMOUNTS,
            truncate_at_tab: false,
        }
    }
}

// ============================================================================
// SHARED LOADING
// ============================================================================

/// Read all `*.{extension}` files in `dir`, in file-name order, keeping
/// only the declared `columns` (located by header name).
pub fn load_directory(
    dir: &Path,
    extension: &str,
    columns: &[&str],
    source: SourceType,
) -> Result<RawBatch> {
    let files = list_files(dir, extension)?;
    if files.is_empty() {
        tracing::warn!(source = %source, dir = %dir.display(), "No .{} files found", extension);
    }

    let mut batch = RawBatch::new(columns);

    for file in &files {
        let before = batch.len();
        read_file(file, columns, source, &mut batch)?;
        tracing::debug!(
            source = %source,
            file = %file.display(),
            rows = batch.len() - before,
            "Read export file"
        );
    }

    tracing::info!(source = %source, files = files.len(), rows = batch.len(), "Loaded source");
    Ok(batch)
}

fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| with_path(e, dir))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| with_path(e, dir))?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn read_file(file: &Path, columns: &[&str], source: SourceType, batch: &mut RawBatch) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(file)?;

    let headers = reader.headers()?.clone();
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        let idx = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == *column)
            .ok_or_else(|| {
                PipelineError::schema(format!(
                    "Expected column '{}' not found in {} file {}",
                    column,
                    source,
                    file.display()
                ))
            })?;
        indices.push(idx);
    }

    for (row_num, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row_num as u64 + 2); // 1-indexed + header row

        let values = indices
            .iter()
            .map(|&idx| record.get(idx).unwrap_or("").to_string())
            .collect();

        batch.rows.push(RawRow::new(values, file.to_path_buf(), line));
    }

    Ok(())
}

fn with_path(e: io::Error, path: &Path) -> PipelineError {
    PipelineError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
}

// ============================================================================
// SHARED STANDARDIZATION
// ============================================================================

pub fn standardize_with(
    source: SourceType,
    layout: &ColumnLayout,
    batch: RawBatch,
) -> Result<Vec<Transaction>> {
    let date_idx = require_column(&batch, layout.date, source)?;
    let desc_idx = require_column(&batch, layout.description, source)?;
    let amount_idx = require_column(&batch, layout.amount, source)?;

    let mut transactions = Vec::with_capacity(batch.len());

    for row in batch.rows {
        let cell = |column: &str, idx: usize| CellRef {
            source,
            file: &row.file,
            line: row.line,
            column: column.to_string(),
            value: row.values[idx].clone(),
        };

        let date = parse_date(&cell(layout.date, date_idx), layout.date_format)?;
        let mut amount = parse_amount(&cell(layout.amount, amount_idx))?;
        if layout.negate_amounts {
            amount = -amount;
        }
        if amount.is_zero() {
            // -0.00 after negation
            amount = amount.abs();
        }

        let raw_description = &row.values[desc_idx];
        let description = if layout.truncate_at_tab {
            truncate_at_tab(raw_description)
        } else {
            raw_description.as_str()
        };

        transactions.push(Transaction::new(date, description, amount));
    }

    Ok(transactions)
}

fn require_column(batch: &RawBatch, column: &str, source: SourceType) -> Result<usize> {
    batch.column_index(column).ok_or_else(|| {
        PipelineError::schema(format!(
            "Expected column '{column}' not found in {source} record set"
        ))
    })
}

/// Everything before the first tab
pub fn truncate_at_tab(description: &str) -> &str {
    description.split('\t').next().unwrap_or(description)
}

struct CellRef<'a> {
    source: SourceType,
    file: &'a Path,
    line: u64,
    column: String,
    value: String,
}

impl CellRef<'_> {
    fn parse_error(&self, reason: impl Into<String>) -> PipelineError {
        PipelineError::Parse {
            source_name: self.source.name().to_string(),
            file: self.file.to_path_buf(),
            line: self.line,
            column: self.column.clone(),
            value: self.value.clone(),
            reason: reason.into(),
        }
    }
}

fn parse_date(cell: &CellRef<'_>, format: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(cell.value.trim(), format)
        .map_err(|e| cell.parse_error(format!("expected date as {format}: {e}")))?;

    // %Y takes any number of digits: "14/03/24" would parse as year 24
    if format.contains("%Y") && !(1000..=9999).contains(&date.year()) {
        return Err(cell.parse_error(format!("expected date as {format} with a four-digit year")));
    }
    Ok(date)
}

fn parse_amount(cell: &CellRef<'_>) -> Result<Decimal> {
    let s = cell.value.trim();
    let s = s.strip_prefix('+').unwrap_or(s).replace(',', "");
    if s.is_empty() {
        return Err(cell.parse_error("empty amount"));
    }
    Decimal::from_str(&s).map_err(|e| cell.parse_error(format!("invalid amount: {e}")))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FlowType;
    use std::fs;
    use tempfile::tempdir;

    const BARCLAYS_HEADER: &str = "Number,Date,Account,Amount,Subcategory,Memo\n";
    const MBNA_HEADER: &str = "Date,Date entered,Reference,Description,Amount,\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_source_type_names_and_codes() {
        assert_eq!(SourceType::Barclays.name(), "Barclays");
        assert_eq!(SourceType::Mbna.name(), "MBNA");
        assert_eq!(SourceType::Barclays.code(), "barclays");
        assert_eq!(SourceType::Mbna.code(), "mbna");
        assert_eq!("MBNA".parse::<SourceType>().unwrap(), SourceType::Mbna);
        assert!(matches!(
            "monzo".parse::<SourceType>(),
            Err(PipelineError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(registry.get("barclays").unwrap().source_type(), SourceType::Barclays);
        assert_eq!(registry.get("MBNA").unwrap().source_type(), SourceType::Mbna);
        assert!(matches!(registry.get("hsbc"), Err(PipelineError::UnknownSource(_))));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["barclays", "mbna"]);
    }

    #[test]
    fn test_barclays_load_and_standardize() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("march.csv"),
            format!(
                "{BARCLAYS_HEADER}\
                 ,14/03/2024,20-00-00 12345678,-23.45,PAYMENT,TESCO STORES 3021\tON 13 MAR BCC\n\
                 ,15/03/2024,20-00-00 12345678,1500.00,DIRECTDEP,ACME LTD SALARY\n"
            ),
        )
        .unwrap();

        let parser = BarclaysParser::new();
        let batch = parser.load(dir.path()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.columns, BarclaysParser::COLUMNS);

        let txs = parser.standardize(batch).unwrap();
        assert_eq!(txs[0].date, date(2024, 3, 14));
        assert_eq!(txs[0].description, "TESCO STORES 3021");
        assert_eq!(txs[0].amount, Decimal::new(-2345, 2));
        assert_eq!(txs[0].flow_type, FlowType::Outflow);
        assert_eq!(txs[1].amount, Decimal::new(150000, 2));
        assert_eq!(txs[1].flow_type, FlowType::Inflow);
        assert!(txs.iter().all(|t| t.classification.is_none()));
    }

    #[test]
    fn test_mbna_negates_amounts() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("statement.csv"),
            format!(
                "{MBNA_HEADER}\
                 12/03/2024,13/03/2024,2449215,AMAZON.CO.UK,12.99,\n\
                 20/03/2024,20/03/2024,2449216,PAYMENT RECEIVED - THANK YOU,-12.50,\n"
            ),
        )
        .unwrap();

        let parser = MbnaParser::new();
        let txs = parser.standardize(parser.load(dir.path()).unwrap()).unwrap();

        assert_eq!(txs[0].amount, Decimal::new(-1299, 2));
        assert_eq!(txs[0].flow_type, FlowType::Outflow);
        assert_eq!(txs[1].amount.to_string(), "12.50");
        assert_eq!(txs[1].flow_type, FlowType::Inflow);
    }

    #[test]
    fn test_mbna_zero_amount_is_not_negative_zero() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("s.csv"),
            format!("{MBNA_HEADER}01/04/2024,01/04/2024,1,ADJUSTMENT,0.00,\n"),
        )
        .unwrap();

        let parser = MbnaParser::new();
        let txs = parser.standardize(parser.load(dir.path()).unwrap()).unwrap();
        assert_eq!(txs[0].amount.to_string(), "0.00");
        assert_eq!(txs[0].flow_type, FlowType::Inflow);
    }

    #[test]
    fn test_load_reads_only_matching_extension_in_name_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("b.csv"),
            format!("{MBNA_HEADER}02/01/2024,02/01/2024,2,SECOND,2.00,\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("a.csv"),
            format!("{MBNA_HEADER}01/01/2024,01/01/2024,1,FIRST,1.00,\n"),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not an export").unwrap();

        let batch = MbnaParser::new().load(dir.path()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows[0].values[3], "FIRST");
        assert_eq!(batch.rows[1].values[3], "SECOND");
        assert_eq!(batch.rows[0].line, 2);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bad.csv"),
            "Number,Date,Account,Amount,Memo\n,14/03/2024,x,-1.00,SHOP\n",
        )
        .unwrap();

        let err = BarclaysParser::new().load(dir.path()).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("Subcategory"));
    }

    #[test]
    fn test_unparseable_date_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("s.csv"),
            format!("{MBNA_HEADER}2024-03-12,13/03/2024,1,SHOP,1.00,\n"),
        )
        .unwrap();

        let parser = MbnaParser::new();
        let err = parser.standardize(parser.load(dir.path()).unwrap()).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("'Date'"));
    }

    #[test]
    fn test_two_digit_year_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("s.csv"),
            format!("{MBNA_HEADER}14/03/24,14/03/24,1,SHOP,1.00,\n"),
        )
        .unwrap();

        let parser = MbnaParser::new();
        let err = parser.standardize(parser.load(dir.path()).unwrap()).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("four-digit year"));
    }

    #[test]
    fn test_unparseable_amount_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("s.csv"),
            format!("{BARCLAYS_HEADER},14/03/2024,x,nan,PAYMENT,SHOP\n"),
        )
        .unwrap();

        let parser = BarclaysParser::new();
        let err = parser.standardize(parser.load(dir.path()).unwrap()).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("'Amount'"));
    }

    #[test]
    fn test_empty_amount_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("s.csv"),
            format!("{BARCLAYS_HEADER},14/03/2024,x,,PAYMENT,SHOP\n"),
        )
        .unwrap();

        let parser = BarclaysParser::new();
        assert!(parser
            .standardize(parser.load(dir.path()).unwrap())
            .unwrap_err()
            .is_parse());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let err = MbnaParser::new()
            .load(Path::new("/no/such/export/dir"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(err.to_string().contains("/no/such/export/dir"));
    }

    #[test]
    fn test_truncate_at_tab() {
        assert_eq!(truncate_at_tab("TESCO\tON 13 MAR"), "TESCO");
        assert_eq!(truncate_at_tab("NO TAB HERE"), "NO TAB HERE");
        assert_eq!(truncate_at_tab("\tLEADING"), "");
    }

    #[test]
    fn test_parse_amount_variants() {
        let file = PathBuf::from("x.csv");
        let cell = |v: &str| CellRef {
            source: SourceType::Barclays,
            file: &file,
            line: 2,
            column: "Amount".to_string(),
            value: v.to_string(),
        };

        assert_eq!(parse_amount(&cell(" -12.50 ")).unwrap(), Decimal::new(-1250, 2));
        assert_eq!(parse_amount(&cell("+3.10")).unwrap(), Decimal::new(310, 2));
        assert_eq!(parse_amount(&cell("1,234.56")).unwrap(), Decimal::new(123456, 2));
        assert!(parse_amount(&cell("twelve")).is_err());
    }
}
