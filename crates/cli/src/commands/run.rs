//! Run command - periodic ingestion of every enabled source

use anyhow::{Context, Result, bail};
use onion_reader_adapters::{
    sources::{ArknightsSource, Honkai3Source},
    store::SqliteEntryStore,
};
use onion_reader_domain::{
    Ingest,
    usecases::{CycleOutcome, ListingIngest, PagedIngest, Supervisor, SupervisorConfig},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::RunArgs;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!(
        once = args.once,
        database = %config.general.database_path.display(),
        interval_secs = config.scheduler.interval_secs,
        "Starting onion-reader run"
    );

    let store = Arc::new(
        SqliteEntryStore::new(&config.general.database_path)
            .await
            .context("Failed to initialize SQLite entry store")?,
    );

    let jobs = build_jobs(&config, store)?;
    if jobs.is_empty() {
        bail!("No sources enabled; enable at least one under [sources]");
    }

    let supervisor = Supervisor::new(
        jobs,
        SupervisorConfig {
            interval: Duration::from_secs(config.scheduler.interval_secs),
            run_on_start: config.scheduler.run_on_start,
        },
    );

    if args.once {
        tracing::info!("Running single ingest round");
        let reports = supervisor.run_once().await;

        let failed: Vec<_> = reports
            .iter()
            .filter(|r| matches!(r.outcome, CycleOutcome::Failed(_)))
            .map(|r| r.source.as_str())
            .collect();
        if !failed.is_empty() {
            bail!("Ingest failed for: {}", failed.join(", "));
        }
    } else {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            tracing::info!("Shutdown signal received");
        };

        supervisor.run(shutdown).await;
    }

    tracing::info!("onion-reader run completed");
    Ok(())
}

fn build_jobs(config: &AppConfig, store: Arc<SqliteEntryStore>) -> Result<Vec<Arc<dyn Ingest>>> {
    let timeout = Duration::from_secs(config.http.timeout_secs);
    let mut jobs: Vec<Arc<dyn Ingest>> = Vec::new();

    let arknights = &config.sources.arknights;
    if arknights.enabled {
        let source = ArknightsSource::new(arknights, timeout)
            .context("Failed to initialize Arknights source")?;
        jobs.push(Arc::new(ListingIngest::new(Arc::new(source), store.clone())));
    } else {
        tracing::info!(feed = %arknights.feed_name, "Source disabled");
    }

    let honkai3 = &config.sources.honkai3;
    if honkai3.enabled {
        let source = Honkai3Source::new(honkai3, timeout)
            .context("Failed to initialize Honkai Impact 3 source")?;
        jobs.push(Arc::new(
            PagedIngest::new(Arc::new(source), store).with_max_pages(honkai3.max_pages),
        ));
    } else {
        tracing::info!(feed = %honkai3.feed_name, "Source disabled");
    }

    Ok(jobs)
}
