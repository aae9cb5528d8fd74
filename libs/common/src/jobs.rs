//! Durable job queue backed by the `jobs` table
//!
//! Long-running model calls and best-effort side effects are queued here so
//! their state survives process restarts. Workers claim jobs with
//! `FOR UPDATE SKIP LOCKED`, so several workers can poll concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DatabaseError, DatabaseResult};

const JOB_COLUMNS: &str = "id, kind, payload, status, attempts, max_attempts, execute_at, \
     locked_at, result, last_error, created_at, updated_at";

/// What a job does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    GenerateMatches,
    DeliverNotification,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::GenerateMatches => "generate_matches",
            JobKind::DeliverNotification => "deliver_notification",
        }
    }
}

impl FromStr for JobKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate_matches" => Ok(JobKind::GenerateMatches),
            "deliver_notification" => Ok(JobKind::DeliverNotification),
            other => Err(DatabaseError::CorruptRecord(format!("unknown job kind '{}'", other))),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DatabaseError::CorruptRecord(format!(
                "unknown job status '{}'",
                other
            ))),
        }
    }
}

/// A queued unit of work
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: i64,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub execute_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    fn from_row(row: &PgRow) -> DatabaseResult<Self> {
        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;

        Ok(Job {
            id: row.try_get("id")?,
            kind: kind.parse()?,
            payload: row.try_get("payload")?,
            status: status.parse()?,
            attempts: row.try_get("attempts")?,
            max_attempts: row.try_get("max_attempts")?,
            execute_at: row.try_get("execute_at")?,
            locked_at: row.try_get("locked_at")?,
            result: row.try_get("result")?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Attempts left after the current one fails
    pub fn remaining_attempts(&self) -> i32 {
        (self.max_attempts - self.attempts - 1).max(0)
    }
}

/// Linear backoff: the n-th retry waits `n * base`.
pub fn retry_delay(attempt: i32, base: Duration) -> Duration {
    base * attempt.max(1) as u32
}

/// Job queue repository
#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a job due immediately
    pub async fn enqueue(
        &self,
        kind: JobKind,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> DatabaseResult<Job> {
        let row = sqlx::query(&format!(
            "INSERT INTO jobs (kind, payload, status, attempts, max_attempts, execute_at)
             VALUES ($1, $2, 'queued', 0, $3, NOW())
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(kind.as_str())
        .bind(&payload)
        .bind(max_attempts.max(1))
        .fetch_one(&self.pool)
        .await?;

        let job = Job::from_row(&row)?;
        info!(job_id = job.id, kind = %kind, "Job enqueued");
        Ok(job)
    }

    /// Claim the oldest due job, marking it running
    pub async fn lock_next(&self) -> DatabaseResult<Option<Job>> {
        let row = sqlx::query(&format!(
            "UPDATE jobs
             SET status = 'running', locked_at = NOW(), updated_at = NOW()
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'queued' AND execute_at <= NOW()
                 ORDER BY execute_at ASC, id ASC
                 FOR UPDATE SKIP LOCKED
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Job::from_row).transpose()
    }

    pub async fn get(&self, id: i64) -> DatabaseResult<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Job::from_row).transpose()
    }

    /// Mark a job succeeded and store its result
    pub async fn complete(&self, id: i64, result: serde_json::Value) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE jobs
             SET status = 'succeeded', attempts = attempts + 1, result = $2,
                 locked_at = NULL, last_error = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await?;

        debug!(job_id = id, "Job completed");
        Ok(())
    }

    /// Return a job to the queue after a failed attempt
    pub async fn retry(
        &self,
        id: i64,
        attempts: i32,
        execute_at: DateTime<Utc>,
        error: &str,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE jobs
             SET status = 'queued', attempts = $2, execute_at = $3, last_error = $4,
                 locked_at = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempts)
        .bind(execute_at)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a job permanently failed
    pub async fn fail(&self, id: i64, attempts: i32, error: &str) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE jobs
             SET status = 'failed', attempts = $2, last_error = $3,
                 locked_at = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Requeue jobs left running by a worker that died mid-job
    pub async fn requeue_stale(&self, older_than: Duration) -> DatabaseResult<u64> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| DatabaseError::Configuration(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE jobs
             SET status = 'queued', locked_at = NULL, updated_at = NOW()
             WHERE status = 'running' AND locked_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let requeued = result.rows_affected();
        if requeued > 0 {
            info!(requeued, "Requeued stale running jobs");
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_linear() {
        let base = Duration::from_secs(5);
        assert_eq!(retry_delay(1, base), Duration::from_secs(5));
        assert_eq!(retry_delay(2, base), Duration::from_secs(10));
        assert_eq!(retry_delay(3, base), Duration::from_secs(15));
    }

    #[test]
    fn test_retry_delay_floor() {
        let base = Duration::from_secs(5);
        assert_eq!(retry_delay(0, base), base);
        assert_eq!(retry_delay(-3, base), base);
    }

    #[test]
    fn test_unknown_kind_is_corrupt() {
        let result = "resize_thumbnail".parse::<JobKind>();
        assert!(matches!(result, Err(DatabaseError::CorruptRecord(_))));
        assert_eq!(
            "deliver_notification".parse::<JobKind>().unwrap(),
            JobKind::DeliverNotification
        );
    }

    #[test]
    fn test_remaining_attempts() {
        let now = Utc::now();
        let job = Job {
            id: 1,
            kind: JobKind::GenerateMatches,
            payload: serde_json::json!({}),
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 3,
            execute_at: now,
            locked_at: Some(now),
            result: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(job.remaining_attempts(), 1);
    }
}
