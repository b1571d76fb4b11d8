use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use yisubench_core::prelude::{BenchScore, DelegatedShutdownListener};

use crate::error::{QueueError, QueueResult};
use crate::model::{Job, JobRow, JobStatus, ScoreRecord, ScoreRow};
use crate::schema::init_schema;

/// Lease based queue of benchmark jobs.
///
/// A job is claimed by flipping it from standby to running inside a transaction. A job that stays
/// running longer than the lease timeout is assumed abandoned and put back on standby.
#[derive(Debug, Clone)]
pub struct JobQueue {
    pool: SqlitePool,
}

impl JobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `url`, creating the file and the schema when missing.
    pub async fn connect(url: &str) -> QueueResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        init_schema(&pool).await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn register_team(&self, name: &str, host: &str) -> QueueResult<i64> {
        let result = sqlx::query("INSERT INTO teams (name, host) VALUES (?, ?)")
            .bind(name)
            .bind(host)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Put a new standby job for `team_id` on the queue.
    pub async fn enqueue(&self, team_id: i64) -> QueueResult<i64> {
        let result = sqlx::query("INSERT INTO queue (team_id, status, date) VALUES (?, ?, ?)")
            .bind(team_id)
            .bind(JobStatus::Standby.as_i64())
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Claim the oldest standby job.
    ///
    /// Fails with [QueueError::NoJobAvailable] when nothing is waiting, and with
    /// [QueueError::ClaimRace] when the conditional update did not change exactly one row.
    /// SQLite serializes writers, so a concurrent claimer sees the job already running and gets
    /// [QueueError::NoJobAvailable]; the race check only guards against other storage backends.
    pub async fn fetch_queue(&self) -> QueueResult<Job> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, JobRow>(
            "SELECT q.id AS queue_id, q.team_id, t.host, q.status, q.date
             FROM queue q JOIN teams t ON t.id = q.team_id
             WHERE q.status = ?
             ORDER BY q.date, q.id
             LIMIT 1",
        )
        .bind(JobStatus::Standby.as_i64())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(QueueError::NoJobAvailable)?;

        let claimed_at = now_millis();
        let result = sqlx::query("UPDATE queue SET status = ?, date = ? WHERE id = ? AND status = ?")
            .bind(JobStatus::Running.as_i64())
            .bind(claimed_at)
            .bind(row.queue_id)
            .bind(JobStatus::Standby.as_i64())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(QueueError::ClaimRace {
                queue_id: row.queue_id,
                rows: result.rows_affected(),
            });
        }

        tx.commit().await?;

        Job::try_from(JobRow {
            status: JobStatus::Running.as_i64(),
            date: claimed_at,
            ..row
        })
    }

    /// Put every running job whose lease is older than `lease_timeout` back on standby.
    ///
    /// Returns the number of reclaimed jobs.
    pub async fn reclaim_stale(&self, lease_timeout: Duration) -> QueueResult<u64> {
        let lease = chrono::Duration::from_std(lease_timeout).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(lease)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE queue SET status = ? WHERE status = ? AND date < ?")
            .bind(JobStatus::Standby.as_i64())
            .bind(JobStatus::Running.as_i64())
            .bind(cutoff.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() > 0 {
            log::warn!("Reclaimed {} stale jobs", result.rows_affected());
        }

        Ok(result.rows_affected())
    }

    /// Mark the team's job done and store its score, atomically.
    ///
    /// The transaction is rolled back with [QueueError::TooManyRows] if more than one job of the
    /// team was still open.
    pub async fn save_result(
        &self,
        team_id: i64,
        queue_id: i64,
        score: &BenchScore,
    ) -> QueueResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE queue SET status = ? WHERE team_id = ? AND status != ?")
            .bind(JobStatus::Done.as_i64())
            .bind(team_id)
            .bind(JobStatus::Done.as_i64())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 1 {
            return Err(QueueError::TooManyRows {
                team_id,
                rows: result.rows_affected(),
            });
        }

        sqlx::query("INSERT INTO scores (queue_id, score, message, date) VALUES (?, ?, ?, ?)")
            .bind(queue_id)
            .bind(score.points)
            .bind(score.error_message())
            .bind(now_millis())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Poll until a job can be claimed, or until shutdown is signalled.
    ///
    /// Stale leases are reclaimed on every tick before claiming. Failed attempts are logged and
    /// the poll goes on.
    pub async fn wait_for_job(
        &self,
        interval: Duration,
        lease_timeout: Duration,
        shutdown: &mut DelegatedShutdownListener,
    ) -> Option<Job> {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait_for_shutdown() => return None,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.reclaim_stale(lease_timeout).await {
                log::error!("Failed to reclaim stale jobs: {e}");
            }

            match self.fetch_queue().await {
                Ok(job) => return Some(job),
                Err(QueueError::NoJobAvailable) => {}
                Err(e) => log::warn!("Failed to claim a job: {e}"),
            }
        }
    }

    pub async fn status_of(&self, queue_id: i64) -> QueueResult<JobStatus> {
        let status: i64 = sqlx::query_scalar("SELECT status FROM queue WHERE id = ?")
            .bind(queue_id)
            .fetch_one(&self.pool)
            .await?;
        JobStatus::try_from(status)
    }

    pub async fn scores(&self, queue_id: i64) -> QueueResult<Vec<ScoreRecord>> {
        sqlx::query_as::<_, ScoreRow>(
            "SELECT id, queue_id, score, message, date FROM scores WHERE queue_id = ? ORDER BY id",
        )
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ScoreRecord::try_from)
        .collect()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
