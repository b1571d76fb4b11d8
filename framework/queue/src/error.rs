use thiserror::Error;

/// Failures of the job queue.
///
/// [QueueError::ClaimRace] and [QueueError::TooManyRows] mean the queue table is not in the
/// state this process expected. They end the current attempt, not the process.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no job available")]
    NoJobAvailable,

    #[error("claim of queue #{queue_id} updated {rows} rows")]
    ClaimRace { queue_id: i64, rows: u64 },

    #[error("too many update request : may be bad logic (team #{team_id}, {rows} rows)")]
    TooManyRows { team_id: i64, rows: u64 },

    #[error("invalid job status: {0}")]
    InvalidStatus(i64),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

pub type QueueResult<T> = Result<T, QueueError>;

impl QueueError {
    pub fn is_no_job(&self) -> bool {
        matches!(self, Self::NoJobAvailable)
    }
}
