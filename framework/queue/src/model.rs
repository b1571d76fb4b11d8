use chrono::{DateTime, Utc};

use crate::error::{QueueError, QueueResult};

/// Lifecycle of a queue entry. Stored as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Done = 0,
    Standby = 1,
    Running = 2,
}

impl JobStatus {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for JobStatus {
    type Error = QueueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Done),
            1 => Ok(Self::Standby),
            2 => Ok(Self::Running),
            other => Err(QueueError::InvalidStatus(other)),
        }
    }
}

/// A claimed benchmark job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub team_id: i64,
    pub queue_id: i64,
    pub host: String,
    pub status: JobStatus,
    pub claimed_at: DateTime<Utc>,
}

/// A persisted benchmark result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub id: i64,
    pub queue_id: i64,
    pub score: i64,
    pub message: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobRow {
    pub queue_id: i64,
    pub team_id: i64,
    pub host: String,
    pub status: i64,
    pub date: i64,
}

impl TryFrom<JobRow> for Job {
    type Error = QueueError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            team_id: row.team_id,
            queue_id: row.queue_id,
            host: row.host,
            status: JobStatus::try_from(row.status)?,
            claimed_at: from_millis(row.date)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ScoreRow {
    pub id: i64,
    pub queue_id: i64,
    pub score: i64,
    pub message: String,
    pub date: i64,
}

impl TryFrom<ScoreRow> for ScoreRecord {
    type Error = QueueError;

    fn try_from(row: ScoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            queue_id: row.queue_id,
            score: row.score,
            message: row.message,
            date: from_millis(row.date)?,
        })
    }
}

pub(crate) fn from_millis(millis: i64) -> QueueResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(QueueError::InvalidTimestamp(millis))
}
