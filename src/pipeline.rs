// 🚀 Pipeline Orchestrator - one batch run, start to finish
//
// LOAD → DEDUPE → STANDARDIZE (per source) → MERGE → SORT (date desc)
//   → CLASSIFY → NORMALIZE → VALIDATE → PERSIST(file) → PERSIST(database)
//
// Any error aborts the run before the first write.

use crate::classifier::Classifier;
use crate::deduplication::DeduplicationEngine;
use crate::error::Result;
use crate::normalizer::Normalizer;
use crate::output;
use crate::parser::ParserRegistry;
use crate::record::Transaction;
use crate::schema::{SchemaValidator, POST_COLUMNS, PRE_COLUMNS};
use crate::sink::TransactionSink;
use crate::taxonomy::Taxonomy;
use std::path::PathBuf;

/// What the core needs to run: no environment, no credentials
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// (registered source name, directory) in processing order
    pub sources: Vec<(String, PathBuf)>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_loaded_per_source: Vec<(String, usize)>,
    pub duplicates_removed_per_source: Vec<(String, usize)>,
    pub suppressed: usize,
    pub unclassified: usize,
    pub rows_written: usize,
    /// None when no database sink was configured
    pub rows_persisted: Option<usize>,
}

impl RunSummary {
    pub fn total_loaded(&self) -> usize {
        self.rows_loaded_per_source.iter().map(|(_, n)| n).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.duplicates_removed_per_source.iter().map(|(_, n)| n).sum()
    }
}

pub struct Pipeline {
    registry: ParserRegistry,
    dedup: DeduplicationEngine,
    classifier: Classifier,
    normalizer: Normalizer,
    validator: SchemaValidator,
}

impl Pipeline {
    /// Barclays and MBNA adapters, classifier and normalizer built from one taxonomy
    pub fn new(taxonomy: Taxonomy) -> Result<Self> {
        Self::with_registry(taxonomy, ParserRegistry::with_defaults())
    }

    pub fn with_registry(taxonomy: Taxonomy, registry: ParserRegistry) -> Result<Self> {
        let normalizer = Normalizer::from_taxonomy(&taxonomy);
        let classifier = Classifier::new(taxonomy)?;

        Ok(Pipeline {
            registry,
            dedup: DeduplicationEngine::new(),
            classifier,
            normalizer,
            validator: SchemaValidator::new(),
        })
    }

    /// Every stage up to and including the post-classification gate.
    /// Nothing is written.
    pub fn process(&self, config: &PipelineConfig) -> Result<(Vec<Transaction>, RunSummary)> {
        let mut summary = RunSummary::default();
        let mut merged = Vec::new();

        for (name, dir) in &config.sources {
            let parser = self.registry.get(name)?;
            let source = parser.source_type();

            let batch = parser.load(dir)?;
            summary.rows_loaded_per_source.push((name.clone(), batch.len()));

            let outcome = self.dedup.remove_duplicates(source, batch);
            summary
                .duplicates_removed_per_source
                .push((name.clone(), outcome.removed()));

            let standardized = parser.standardize(outcome.batch)?;
            self.validator.validate(&standardized, PRE_COLUMNS)?;

            merged.extend(standardized);
        }

        // Stable: same-date records keep source order, then row order
        merged.sort_by(|a, b| b.date.cmp(&a.date));

        let (classified, unclassified) = self.classifier.classify_all(merged);
        summary.unclassified = unclassified;
        tracing::info!(
            rows = classified.len(),
            unclassified,
            "Classified transactions"
        );

        let (normalized, report) = self.normalizer.normalize(classified);
        summary.suppressed = report.suppressed;

        self.validator.validate(&normalized, POST_COLUMNS)?;

        Ok((normalized, summary))
    }

    /// Full run: process, write the combined file, then load the sink
    pub fn run(
        &self,
        config: &PipelineConfig,
        sink: Option<&mut dyn TransactionSink>,
    ) -> Result<RunSummary> {
        let (transactions, mut summary) = self.process(config)?;

        summary.rows_written = output::write_combined(&config.output_path, &transactions)?;

        if let Some(sink) = sink {
            let persisted = sink.replace_all(&transactions)?;
            tracing::info!(sink = sink.name(), rows = persisted, "Persisted to database");
            summary.rows_persisted = Some(persisted);
        }

        tracing::info!(
            loaded = summary.total_loaded(),
            duplicates = summary.total_duplicates(),
            suppressed = summary.suppressed,
            unclassified = summary.unclassified,
            written = summary.rows_written,
            "Pipeline run complete"
        );

        Ok(summary)
    }
}
