use anyhow::{Context, Result};
use financial_tracker::{Config, Pipeline, Taxonomy, TransactionSink, VERSION};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env();
    tracing::info!(version = VERSION, database = ?config.database.backend, "Starting financial tracker run");
    tracing::debug!(?config, "Loaded configuration");

    let taxonomy = match &config.taxonomy_path {
        Some(path) => Taxonomy::from_file(path)
            .with_context(|| format!("Failed to load taxonomy from {}", path.display()))?,
        None => Taxonomy::builtin().context("Embedded taxonomy is invalid")?,
    };

    let pipeline = Pipeline::new(taxonomy).context("Failed to build classifier")?;

    let mut sink = config
        .database
        .open_sink()
        .context("Failed to open database sink")?;

    let sink_ref = sink.as_mut().map(|s| s.as_mut() as &mut dyn TransactionSink);
    let summary = pipeline
        .run(&config.pipeline_config(), sink_ref)
        .context("Pipeline run failed")?;

    for (source, rows) in &summary.rows_loaded_per_source {
        tracing::info!(source = %source, rows, "Rows loaded");
    }
    tracing::info!(
        output = %config.output_path.display(),
        rows = summary.rows_written,
        persisted = ?summary.rows_persisted,
        "Done"
    );

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
