// 🗂️ Keyword Taxonomy - category → subcategory → keywords, as data
// Declaration order IS priority: the classifier walks it front to back.

use crate::error::{PipelineError, Result};
use crate::record::UNCLASSIFIED;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

const BUILTIN_TAXONOMY: &str = include_str!("../rules/taxonomy.json");

// ============================================================================
// DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubcategoryGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

impl SubcategoryGroup {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        SubcategoryGroup {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    pub subcategories: Vec<SubcategoryGroup>,
}

impl CategoryGroup {
    pub fn new(name: &str, subcategories: Vec<SubcategoryGroup>) -> Self {
        CategoryGroup {
            name: name.to_string(),
            subcategories,
        }
    }
}

/// Rows of `category` whose untrimmed description contains any of
/// `patterns` are administrative notices, not transactions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuppressionRule {
    pub category: String,
    pub patterns: Vec<String>,
}

impl Default for SuppressionRule {
    fn default() -> Self {
        SuppressionRule {
            category: "Financials".to_string(),
            patterns: vec![
                "DIRECT DEBIT PAYMENT".to_string(),
                "PAYMENT RECEIVED - THAN".to_string(),
            ],
        }
    }
}

impl SuppressionRule {
    pub fn applies_to(&self, category: &str, raw_description: &str) -> bool {
        category == self.category
            && self
                .patterns
                .iter()
                .any(|p| raw_description.contains(p.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    categories: Vec<CategoryGroup>,
    #[serde(default)]
    description_map: HashMap<String, String>,
    #[serde(default)]
    suppression: SuppressionRule,
}

// ============================================================================
// TAXONOMY
// ============================================================================

/// Immutable once built. Fields are private so nothing can reorder or
/// extend the taxonomy after validation.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<CategoryGroup>,
    description_map: HashMap<String, String>,
    suppression: SuppressionRule,
}

impl Taxonomy {
    /// Validate and normalize (keywords trimmed + lower-cased)
    pub fn new(
        categories: Vec<CategoryGroup>,
        description_map: HashMap<String, String>,
        suppression: SuppressionRule,
    ) -> Result<Self> {
        let mut seen_categories = HashSet::new();
        let mut normalized = Vec::with_capacity(categories.len());

        for category in categories {
            let name = category.name.trim().to_string();
            check_name(&name, "category")?;
            if !seen_categories.insert(name.clone()) {
                return Err(PipelineError::Taxonomy(format!(
                    "duplicate category '{name}'"
                )));
            }

            let mut seen_subcategories = HashSet::new();
            let mut subcategories = Vec::with_capacity(category.subcategories.len());
            for sub in category.subcategories {
                let sub_name = sub.name.trim().to_string();
                check_name(&sub_name, "subcategory")?;
                if !seen_subcategories.insert(sub_name.clone()) {
                    return Err(PipelineError::Taxonomy(format!(
                        "duplicate subcategory '{sub_name}' under '{name}'"
                    )));
                }

                let mut keywords = Vec::with_capacity(sub.keywords.len());
                for keyword in sub.keywords {
                    let keyword = keyword.trim().to_lowercase();
                    if keyword.is_empty() {
                        return Err(PipelineError::Taxonomy(format!(
                            "empty keyword in '{name}' / '{sub_name}'"
                        )));
                    }
                    keywords.push(keyword);
                }

                subcategories.push(SubcategoryGroup {
                    name: sub_name,
                    keywords,
                });
            }

            normalized.push(CategoryGroup {
                name,
                subcategories,
            });
        }

        if suppression.patterns.iter().any(|p| p.is_empty()) {
            return Err(PipelineError::Taxonomy(
                "suppression patterns must not be empty".to_string(),
            ));
        }

        Ok(Taxonomy {
            categories: normalized,
            description_map,
            suppression,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: TaxonomyFile = serde_json::from_str(content)?;
        Taxonomy::new(file.categories, file.description_map, file.suppression)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let taxonomy = Taxonomy::from_json(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            categories = taxonomy.categories.len(),
            keywords = taxonomy.keyword_count(),
            "Loaded taxonomy"
        );
        Ok(taxonomy)
    }

    /// Taxonomy shipped with the binary
    pub fn builtin() -> Result<Self> {
        Taxonomy::from_json(BUILTIN_TAXONOMY)
    }

    pub fn categories(&self) -> &[CategoryGroup] {
        &self.categories
    }

    pub fn description_map(&self) -> &HashMap<String, String> {
        &self.description_map
    }

    pub fn suppression(&self) -> &SuppressionRule {
        &self.suppression
    }

    pub fn keyword_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .map(|s| s.keywords.len())
            .sum()
    }
}

fn check_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PipelineError::Taxonomy(format!("empty {what} name")));
    }
    if name == UNCLASSIFIED {
        return Err(PipelineError::Taxonomy(format!(
            "'{UNCLASSIFIED}' is reserved and cannot be used as a {what} name"
        )));
    }
    Ok(())
}
