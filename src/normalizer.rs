// 🧹 Normalizer - post-classification cleanup
// Order: suppress (on the untrimmed description) → trim → canonicalize (on the trimmed one)

use crate::record::Transaction;
use crate::taxonomy::{SuppressionRule, Taxonomy};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub suppressed: usize,
    pub canonicalized: usize,
}

pub struct Normalizer {
    suppression: SuppressionRule,
    description_map: HashMap<String, String>,
}

impl Normalizer {
    pub fn new(suppression: SuppressionRule, description_map: HashMap<String, String>) -> Self {
        Normalizer {
            suppression,
            description_map,
        }
    }

    pub fn from_taxonomy(taxonomy: &Taxonomy) -> Self {
        Normalizer::new(
            taxonomy.suppression().clone(),
            taxonomy.description_map().clone(),
        )
    }

    pub fn normalize(&self, transactions: Vec<Transaction>) -> (Vec<Transaction>, NormalizationReport) {
        let mut report = NormalizationReport::default();
        let mut kept = Vec::with_capacity(transactions.len());

        for mut tx in transactions {
            let suppressed = tx
                .category()
                .is_some_and(|category| self.suppression.applies_to(category, &tx.description));
            if suppressed {
                tracing::debug!(date = %tx.date, description = %tx.description, "Suppressed administrative row");
                report.suppressed += 1;
                continue;
            }

            let trimmed = tx.description.trim();
            tx.description = match self.description_map.get(trimmed) {
                Some(canonical) => {
                    report.canonicalized += 1;
                    canonical.clone()
                }
                None => trimmed.to_string(),
            };

            kept.push(tx);
        }

        if report.suppressed > 0 {
            tracing::info!(
                suppressed = report.suppressed,
                category = %self.suppression.category,
                "Removed administrative notices"
            );
        }

        (kept, report)
    }
}
