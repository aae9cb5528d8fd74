//! Payloads for the job routes

use chrono::{DateTime, Utc};
use common::jobs::{Job, JobKind, JobStatus};
use serde::Serialize;

/// Returned when a job is queued
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: i64,
}

/// Job status as exposed to administrators
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: i64,
    pub kind: JobKind,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub result: Option<serde_json::Value>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            status: job.status,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            result: job.result,
            last_error: job.last_error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
