// 🔍 Deduplication Engine - exact full-row duplicates within ONE source batch
// Runs per source before merging: rows from different banks are never compared.

use crate::parser::SourceType;
use crate::record::{RawBatch, RawRow};
use std::collections::HashMap;

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    /// Index (in the input batch) of the occurrence that is kept
    pub kept_index: usize,

    /// Index of the later, identical row that is dropped
    pub duplicate_index: usize,
}

#[derive(Debug, Clone)]
pub struct DeduplicationOutcome {
    pub batch: RawBatch,
    pub matches: Vec<DuplicateMatch>,
}

impl DeduplicationOutcome {
    /// Rows actually removed (a group of three identical rows removes two)
    pub fn removed(&self) -> usize {
        self.matches.len()
    }
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

pub struct DeduplicationEngine;

impl DeduplicationEngine {
    pub fn new() -> Self {
        DeduplicationEngine
    }

    /// Find every row identical (across all declared columns) to an earlier row
    pub fn find_duplicates(&self, rows: &[RawRow]) -> Vec<DuplicateMatch> {
        let mut first_seen: HashMap<&[String], usize> = HashMap::with_capacity(rows.len());
        let mut matches = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            match first_seen.get(row.values.as_slice()) {
                Some(&kept_index) => matches.push(DuplicateMatch {
                    kept_index,
                    duplicate_index: i,
                }),
                None => {
                    first_seen.insert(row.values.as_slice(), i);
                }
            }
        }

        matches
    }

    /// Drop duplicates keeping the first occurrence; warn about what was dropped
    pub fn remove_duplicates(&self, source: SourceType, batch: RawBatch) -> DeduplicationOutcome {
        let matches = self.find_duplicates(&batch.rows);

        if matches.is_empty() {
            return DeduplicationOutcome { batch, matches };
        }

        for m in &matches {
            let kept = &batch.rows[m.kept_index];
            let dup = &batch.rows[m.duplicate_index];
            tracing::warn!(
                source = %source,
                file = %dup.file.display(),
                line = dup.line,
                first_file = %kept.file.display(),
                first_line = kept.line,
                row = %dup.values.join(","),
                "Duplicate row found"
            );
        }

        let mut drop = vec![false; batch.rows.len()];
        for m in &matches {
            drop[m.duplicate_index] = true;
        }

        let RawBatch { columns, rows } = batch;
        let rows = rows
            .into_iter()
            .zip(drop)
            .filter_map(|(row, dropped)| (!dropped).then_some(row))
            .collect();

        tracing::warn!(
            source = %source,
            removed = matches.len(),
            "Removed duplicate rows"
        );

        DeduplicationOutcome {
            batch: RawBatch { columns, rows },
            matches,
        }
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
