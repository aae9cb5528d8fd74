//! Cron-driven job runner
//!
//! Each tick drains every due job from the queue. A failed job is retried
//! with linear backoff until its attempts run out; errors that retrying
//! cannot fix fail the job immediately.

use chrono::Utc;
use common::error::DatabaseError;
use common::jobs::{Job, JobKind, JobQueue, retry_delay};
use matching::{GenerateError, MatchGenerator, MatchStore, run_generation};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{error, info, warn};

use crate::notifier;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    /// Payload does not decode for the job's kind
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),
}

impl JobError {
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Generate(e) => e.is_retryable(),
            JobError::Store(_) => true,
            JobError::InvalidPayload(_) => false,
        }
    }
}

/// What to do with a job after one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Complete(Value),
    Retry { attempts: i32, delay: Duration },
    Fail { attempts: i32 },
}

/// Decide the next state of `job` from the outcome of its current attempt
pub fn next_step(job: &Job, outcome: Result<Value, &JobError>, retry_base: Duration) -> Step {
    let attempts = job.attempts + 1;
    match outcome {
        Ok(result) => Step::Complete(result),
        Err(e) if e.is_retryable() && attempts < job.max_attempts => Step::Retry {
            attempts,
            delay: retry_delay(attempts, retry_base),
        },
        Err(_) => Step::Fail { attempts },
    }
}

/// Executes a single job by kind
#[derive(Clone)]
pub struct JobHandler {
    store: Arc<dyn MatchStore>,
    generator: MatchGenerator,
}

impl JobHandler {
    pub fn new(store: Arc<dyn MatchStore>, generator: MatchGenerator) -> Self {
        Self { store, generator }
    }

    pub async fn execute(&self, kind: JobKind, payload: &Value) -> Result<Value, JobError> {
        match kind {
            JobKind::GenerateMatches => {
                let outcome = run_generation(self.store.as_ref(), &self.generator).await?;
                serde_json::to_value(outcome).map_err(|e| JobError::InvalidPayload(e.to_string()))
            }
            JobKind::DeliverNotification => {
                let notification = notifier::deliver(self.store.as_ref(), payload).await?;
                Ok(json!({ "notification_id": notification.id }))
            }
        }
    }
}

#[derive(Clone)]
pub struct JobRunner {
    queue: JobQueue,
    handler: JobHandler,
    retry_base: Duration,
}

impl JobRunner {
    pub fn new(queue: JobQueue, handler: JobHandler, retry_base: Duration) -> Self {
        Self {
            queue,
            handler,
            retry_base,
        }
    }

    /// Run every due job. Returns how many were processed.
    pub async fn drain(&self) -> Result<usize, DatabaseError> {
        let mut processed = 0;
        while let Some(job) = self.queue.lock_next().await? {
            self.run_job(job).await?;
            processed += 1;
        }
        Ok(processed)
    }

    async fn run_job(&self, job: Job) -> Result<(), DatabaseError> {
        info!(job_id = job.id, kind = %job.kind, attempt = job.attempts + 1, "Running job");

        let outcome = self.handler.execute(job.kind, &job.payload).await;
        match next_step(&job, outcome.as_ref().map(Value::clone), self.retry_base) {
            Step::Complete(result) => {
                self.queue.complete(job.id, result).await?;
                info!(job_id = job.id, kind = %job.kind, "Job succeeded");
            }
            Step::Retry { attempts, delay } => {
                let message = error_message(&outcome);
                let execute_at = Utc::now()
                    + chrono::Duration::from_std(delay)
                        .map_err(|e| DatabaseError::Configuration(e.to_string()))?;
                warn!(
                    job_id = job.id,
                    attempts,
                    delay_seconds = delay.as_secs(),
                    error = %message,
                    "Job failed, retrying"
                );
                self.queue
                    .retry(job.id, attempts, execute_at, &message)
                    .await?;
            }
            Step::Fail { attempts } => {
                let message = error_message(&outcome);
                error!(job_id = job.id, attempts, error = %message, "Job failed permanently");
                self.queue.fail(job.id, attempts, &message).await?;
            }
        }
        Ok(())
    }

    pub async fn start_polling(&self, schedule: &str) -> anyhow::Result<JobScheduler> {
        let runner = self.clone();
        let scheduler = JobScheduler::new().await?;

        let job = CronJob::new_async(schedule, move |_, _| {
            let runner = runner.clone();
            Box::pin(async move {
                match runner.drain().await {
                    Ok(0) => {}
                    Ok(processed) => info!(processed, "Drained job queue"),
                    Err(e) => error!("Failed to drain job queue: {}", e),
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started job polling with schedule: {}", schedule);
        Ok(scheduler)
    }
}

fn error_message(outcome: &Result<Value, JobError>) -> String {
    match outcome {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    }
}
