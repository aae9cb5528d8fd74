use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod notifier;
mod runner;

use common::database::{DatabaseConfig, init_pool};
use common::jobs::JobQueue;
use common::llm::OpenAiBackend;
use common::settings::Settings;
use matching::{MatchGenerator, PgMatchStore};
use runner::{JobHandler, JobRunner};

/// Jobs left running longer than this belong to a dead worker
const STALE_JOB_AGE: Duration = Duration::from_secs(15 * 60);

/// Directives used when `RUST_LOG` is unset or unparseable
const DEFAULT_LOG_FILTER: &str = "info";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    info!("Starting job worker");

    let settings = Settings::from_env()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    let queue = JobQueue::new(pool.clone());
    queue.requeue_stale(STALE_JOB_AGE).await?;

    let backend = OpenAiBackend::from_settings(&settings.llm)?;
    let handler = JobHandler::new(
        Arc::new(PgMatchStore::new(pool)),
        MatchGenerator::from_settings(Arc::new(backend), &settings.llm),
    );

    let runner = JobRunner::new(
        queue,
        handler,
        Duration::from_secs(settings.jobs.retry_base_seconds),
    );

    // Start the polling scheduler
    let mut scheduler = runner.start_polling(&settings.jobs.poll_schedule).await?;

    info!("Job worker started successfully");

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down job worker");
    scheduler.shutdown().await?;

    Ok(())
}
