use sqlx::SqlitePool;

use crate::error::QueueResult;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        host TEXT NOT NULL
    )",
    // status: 0 done, 1 standby, 2 running. date is epoch millis.
    "CREATE TABLE IF NOT EXISTS queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        team_id INTEGER NOT NULL REFERENCES teams (id),
        status INTEGER NOT NULL DEFAULT 1,
        date INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS queue_status_date ON queue (status, date)",
    "CREATE TABLE IF NOT EXISTS scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        queue_id INTEGER NOT NULL REFERENCES queue (id),
        score INTEGER NOT NULL,
        message TEXT NOT NULL,
        date INTEGER NOT NULL
    )",
];

/// Create the `teams`, `queue` and `scores` tables if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> QueueResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
