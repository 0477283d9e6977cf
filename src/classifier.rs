// 🏷️ Classifier - first-match-wins keyword scan over the taxonomy
// Whole-word, case-insensitive. No scoring: the earliest declared keyword wins.

use crate::error::{PipelineError, Result};
use crate::record::{Classification, Transaction};
use crate::taxonomy::Taxonomy;
use regex::Regex;

// ============================================================================
// KEYWORD PATTERNS
// ============================================================================

/// Build the whole-word pattern for a keyword.
///
/// Tokens are escaped and joined with `\s+`, so "market  hall" in a
/// description still matches the keyword "market hall". A `\b` anchor is
/// only added on a side whose edge character is a word character: a
/// keyword like "b/card" or "ltd." must still match literally.
pub fn keyword_pattern(keyword: &str) -> String {
    let tokens: Vec<String> = keyword
        .split_whitespace()
        .map(|t| regex::escape(&t.to_lowercase()))
        .collect();
    let body = tokens.join(r"\s+");

    let trimmed = keyword.trim();
    let leading = trimmed.chars().next().is_some_and(is_word_char);
    let trailing = trimmed.chars().last().is_some_and(is_word_char);

    format!(
        "{}{}{}",
        if leading { r"\b" } else { "" },
        body,
        if trailing { r"\b" } else { "" }
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct CompiledKeyword {
    regex: Regex,
    category: usize,
    subcategory: usize,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Keywords flattened in declaration order (category, then subcategory,
/// then keyword), so a linear scan is exactly the nested first-match walk.
pub struct Classifier {
    taxonomy: Taxonomy,
    keywords: Vec<CompiledKeyword>,
}

impl Classifier {
    pub fn new(taxonomy: Taxonomy) -> Result<Self> {
        let mut keywords = Vec::with_capacity(taxonomy.keyword_count());

        for (ci, category) in taxonomy.categories().iter().enumerate() {
            for (si, sub) in category.subcategories.iter().enumerate() {
                for keyword in &sub.keywords {
                    let regex = Regex::new(&keyword_pattern(keyword)).map_err(|e| {
                        PipelineError::Taxonomy(format!("keyword '{keyword}' failed to compile: {e}"))
                    })?;
                    keywords.push(CompiledKeyword {
                        regex,
                        category: ci,
                        subcategory: si,
                    });
                }
            }
        }

        Ok(Classifier { taxonomy, keywords })
    }

    /// (category, subcategory) of the first matching keyword, or ("None", "None")
    pub fn classify(&self, description: &str) -> Classification {
        let text = description.to_lowercase();

        self.keywords
            .iter()
            .find(|k| k.regex.is_match(&text))
            .map(|k| {
                let category = &self.taxonomy.categories()[k.category];
                Classification::new(
                    category.name.clone(),
                    category.subcategories[k.subcategory].name.clone(),
                )
            })
            .unwrap_or_else(Classification::unmatched)
    }

    /// Classify every record, preserving order. Returns the number left unmatched.
    pub fn classify_all(&self, transactions: Vec<Transaction>) -> (Vec<Transaction>, usize) {
        let mut unmatched = 0;

        let classified = transactions
            .into_iter()
            .map(|tx| {
                let classification = self.classify(&tx.description);
                if classification.is_unmatched() {
                    unmatched += 1;
                    tracing::debug!(description = %tx.description, "No taxonomy keyword matched");
                }
                tx.with_classification(classification)
            })
            .collect();

        (classified, unmatched)
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{CategoryGroup, SubcategoryGroup, SuppressionRule};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn classifier(categories: Vec<CategoryGroup>) -> Classifier {
        let taxonomy =
            Taxonomy::new(categories, HashMap::new(), SuppressionRule::default()).unwrap();
        Classifier::new(taxonomy).unwrap()
    }

    #[test]
    fn test_whole_word_match_case_insensitive() {
        let c = classifier(vec![CategoryGroup::new(
            "Groceries",
            vec![SubcategoryGroup::new("Supermarkets", &["tesco"])],
        )]);

        assert_eq!(
            c.classify("TESCO STORES 3021"),
            Classification::new("Groceries", "Supermarkets")
        );
        // Substring inside a longer word is not a match
        assert!(c.classify("TESCOMART").is_unmatched());
    }

    #[test]
    fn test_first_declared_category_wins() {
        let c = classifier(vec![
            CategoryGroup::new("A", vec![SubcategoryGroup::new("a1", &["amazon", "x", "y"])]),
            CategoryGroup::new("B", vec![SubcategoryGroup::new("b1", &["p", "q", "amazon"])]),
        ]);

        assert_eq!(c.classify("amazon order"), Classification::new("A", "a1"));
    }

    #[test]
    fn test_reordering_categories_changes_result() {
        let c = classifier(vec![
            CategoryGroup::new("B", vec![SubcategoryGroup::new("b1", &["p", "q", "amazon"])]),
            CategoryGroup::new("A", vec![SubcategoryGroup::new("a1", &["amazon"])]),
        ]);

        assert_eq!(c.classify("amazon order"), Classification::new("B", "b1"));
    }

    #[test]
    fn test_keyword_order_within_subcategory_irrelevant_for_single_match() {
        let forward = classifier(vec![CategoryGroup::new(
            "Bills",
            vec![SubcategoryGroup::new("Streaming", &["netflix", "spotify", "disney"])],
        )]);
        let reversed = classifier(vec![CategoryGroup::new(
            "Bills",
            vec![SubcategoryGroup::new("Streaming", &["disney", "spotify", "netflix"])],
        )]);

        let desc = "NETFLIX.COM MONTHLY";
        assert_eq!(forward.classify(desc), reversed.classify(desc));
    }

    #[test]
    fn test_first_declared_subcategory_wins() {
        let c = classifier(vec![CategoryGroup::new(
            "Financials",
            vec![
                SubcategoryGroup::new("Card Repayments", &["mbna"]),
                SubcategoryGroup::new("Transfers", &["payment"]),
            ],
        )]);

        assert_eq!(
            c.classify("MBNA PAYMENT"),
            Classification::new("Financials", "Card Repayments")
        );
    }

    #[test]
    fn test_unmatched_returns_sentinel() {
        let c = classifier(vec![CategoryGroup::new(
            "Groceries",
            vec![SubcategoryGroup::new("Supermarkets", &["tesco"])],
        )]);

        let result = c.classify("SOMETHING ELSE ENTIRELY");
        assert_eq!(result, Classification::new("None", "None"));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let c = Classifier::new(taxonomy).unwrap();
        for desc in ["AMAZON.CO.UK*AB12CD", "TFL TRAVEL CH", "RANDOM 123", ""] {
            assert_eq!(c.classify(desc), c.classify(desc));
        }
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let c = classifier(vec![
            CategoryGroup::new("Bills", vec![SubcategoryGroup::new("Childcare", &["childcare.tax.ser"])]),
            CategoryGroup::new("Financials", vec![SubcategoryGroup::new("Cards", &["b/card"])]),
            CategoryGroup::new("Groceries", vec![SubcategoryGroup::new("M&S", &["marks&spencer"])]),
            CategoryGroup::new("Holidays", vec![SubcategoryGroup::new("Hotels", &["booking.com"])]),
        ]);

        assert_eq!(c.classify("CHILDCARE.TAX.SER REF 1"), Classification::new("Bills", "Childcare"));
        // '.' must not act as a wildcard
        assert!(c.classify("CHILDCAREXTAXXSER").is_unmatched());
        assert_eq!(c.classify("B/CARD PLAT VISA"), Classification::new("Financials", "Cards"));
        assert_eq!(c.classify("MARKS&SPENCER PLC"), Classification::new("Groceries", "M&S"));
        assert_eq!(c.classify("BOOKING.COM HOTEL"), Classification::new("Holidays", "Hotels"));
    }

    #[test]
    fn test_keyword_with_punctuation_edge_matches() {
        let c = classifier(vec![CategoryGroup::new(
            "Odd",
            vec![SubcategoryGroup::new("Misc", &["ltd.", "(uk)"])],
        )]);

        assert_eq!(c.classify("WIDGETS LTD. LONDON"), Classification::new("Odd", "Misc"));
        assert_eq!(c.classify("WIDGETS LTD."), Classification::new("Odd", "Misc"));
        assert_eq!(c.classify("ACME (UK) SERVICES"), Classification::new("Odd", "Misc"));
    }

    #[test]
    fn test_multi_word_keyword_tolerates_irregular_spacing() {
        let c = classifier(vec![CategoryGroup::new(
            "Going Out",
            vec![SubcategoryGroup::new("Restaurants", &["market   hall"])],
        )]);

        assert_eq!(
            c.classify("MARKET HALL VICTORIA"),
            Classification::new("Going Out", "Restaurants")
        );
        assert_eq!(
            c.classify("MARKET\t HALL"),
            Classification::new("Going Out", "Restaurants")
        );
    }

    #[test]
    fn test_keyword_pattern_anchors() {
        assert_eq!(keyword_pattern("tesco"), r"\btesco\b");
        assert_eq!(keyword_pattern("ltd."), r"\bltd\.");
        assert_eq!(keyword_pattern("market hall"), r"\bmarket\s+hall\b");
    }

    #[test]
    fn test_classify_all_counts_unmatched() {
        let c = classifier(vec![CategoryGroup::new(
            "Groceries",
            vec![SubcategoryGroup::new("Supermarkets", &["lidl"])],
        )]);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let txs = vec![
            Transaction::new(date, "LIDL GB LONDON", Decimal::new(-1200, 2)),
            Transaction::new(date, "UNKNOWN SHOP", Decimal::new(-300, 2)),
        ];

        let (classified, unmatched) = c.classify_all(txs);
        assert_eq!(unmatched, 1);
        assert_eq!(classified[0].category(), Some("Groceries"));
        assert_eq!(classified[1].category(), Some("None"));
        assert_eq!(classified[1].subcategory(), Some("None"));
    }
}
