use std::sync::Arc;

use anyhow::Context;

use log_aggregator_core::logging::init_logger;
use log_aggregator_core::view::display_result;
use log_aggregator_core::{MemoryStore, Pipeline, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_logger(settings.level_filter()?);
    settings.log_summary();

    let store = MemoryStore::init(&settings.database, &settings.connection)
        .with_context(|| format!("failed to connect to {}", settings.connection_for_log()))?;
    let database = settings.database.clone();

    let mut pipeline = Pipeline::new(settings, Arc::new(store));
    let report = pipeline.run().await.context("pipeline run aborted")?;

    log::info!(
        "[run={}] RUN_REPORT archives={} files={} inserted={}",
        report.run_id,
        report.archives_processed,
        report.files_converted,
        report.records_inserted
    );
    display_result(&report.records, &database);
    Ok(())
}
