use std::time::Duration;

use pretty_assertions::assert_eq;
use sqlx::sqlite::SqlitePoolOptions;
use yisubench_core::prelude::{BenchScore, ShutdownHandle};
use yisubench_queue::prelude::{init_schema, JobQueue, JobStatus, QueueError};

async fn memory_queue() -> JobQueue {
    // A single connection, every connection to `:memory:` is a separate database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    JobQueue::new(pool)
}

#[tokio::test]
async fn empty_queue_has_no_job() {
    let queue = memory_queue().await;
    let err = queue.fetch_queue().await.unwrap_err();
    assert!(err.is_no_job(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn claims_oldest_standby_job_first() {
    let queue = memory_queue().await;
    let first_team = queue.register_team("first", "http://10.0.0.1").await.unwrap();
    let second_team = queue.register_team("second", "10.0.0.2").await.unwrap();
    let first = queue.enqueue(first_team).await.unwrap();
    let second = queue.enqueue(second_team).await.unwrap();

    let job = queue.fetch_queue().await.unwrap();
    assert_eq!(job.queue_id, first);
    assert_eq!(job.team_id, first_team);
    assert_eq!(job.host, "http://10.0.0.1");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(queue.status_of(first).await.unwrap(), JobStatus::Running);
    assert_eq!(queue.status_of(second).await.unwrap(), JobStatus::Standby);

    let job = queue.fetch_queue().await.unwrap();
    assert_eq!(job.queue_id, second);

    assert!(matches!(
        queue.fetch_queue().await,
        Err(QueueError::NoJobAvailable)
    ));
}

#[tokio::test]
async fn stale_lease_is_reclaimed() {
    let queue = memory_queue().await;
    let team = queue.register_team("team", "10.0.0.1").await.unwrap();
    let queue_id = queue.enqueue(team).await.unwrap();
    queue.fetch_queue().await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(queue.reclaim_stale(Duration::from_secs(120)).await.unwrap(), 0);
    assert_eq!(queue.status_of(queue_id).await.unwrap(), JobStatus::Running);

    assert_eq!(queue.reclaim_stale(Duration::ZERO).await.unwrap(), 1);
    assert_eq!(queue.status_of(queue_id).await.unwrap(), JobStatus::Standby);

    let job = queue.fetch_queue().await.unwrap();
    assert_eq!(job.queue_id, queue_id);
}

#[tokio::test]
async fn save_result_marks_done_and_stores_score() {
    let queue = memory_queue().await;
    let team = queue.register_team("team", "10.0.0.1").await.unwrap();
    let queue_id = queue.enqueue(team).await.unwrap();
    let job = queue.fetch_queue().await.unwrap();

    let mut score = BenchScore::new();
    score.add(120, None);
    for e in ["request failed", "", "request failed", "worker time out"] {
        score.record_error(e);
    }
    queue.save_result(job.team_id, job.queue_id, &score).await.unwrap();

    assert_eq!(queue.status_of(queue_id).await.unwrap(), JobStatus::Done);
    let scores = queue.scores(queue_id).await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 120);
    assert_eq!(scores[0].message, "request failed\nworker time out\n");
}

#[tokio::test]
async fn save_result_aborts_when_team_has_several_open_jobs() {
    let queue = memory_queue().await;
    let team = queue.register_team("team", "10.0.0.1").await.unwrap();
    let first = queue.enqueue(team).await.unwrap();
    let second = queue.enqueue(team).await.unwrap();
    queue.fetch_queue().await.unwrap();

    let err = queue
        .save_result(team, first, &BenchScore::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::TooManyRows { rows: 2, .. }));

    // Rolled back.
    assert_eq!(queue.status_of(first).await.unwrap(), JobStatus::Running);
    assert_eq!(queue.status_of(second).await.unwrap(), JobStatus::Standby);
    assert!(queue.scores(first).await.unwrap().is_empty());
}

#[tokio::test]
async fn wait_for_job_picks_up_late_jobs() {
    let queue = memory_queue().await;
    let team = queue.register_team("team", "10.0.0.1").await.unwrap();

    let producer = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        producer.enqueue(team).await.unwrap();
    });

    let mut listener = ShutdownHandle::new().new_listener();
    let job = tokio::time::timeout(
        Duration::from_secs(5),
        queue.wait_for_job(
            Duration::from_millis(10),
            Duration::from_secs(120),
            &mut listener,
        ),
    )
    .await
    .unwrap()
    .expect("expected a job");
    assert_eq!(job.team_id, team);
}

#[tokio::test]
async fn wait_for_job_stops_on_shutdown() {
    let queue = memory_queue().await;
    let shutdown = ShutdownHandle::new();
    let mut listener = shutdown.new_listener();
    shutdown.shutdown_after(Duration::from_millis(30));

    let job = queue
        .wait_for_job(
            Duration::from_millis(10),
            Duration::from_secs(120),
            &mut listener,
        )
        .await;
    assert!(job.is_none());
}

#[tokio::test]
async fn connect_creates_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchmarker.db");
    let queue = JobQueue::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();

    let team = queue.register_team("team", "10.0.0.1").await.unwrap();
    queue.enqueue(team).await.unwrap();
    assert!(path.exists());
    assert_eq!(queue.fetch_queue().await.unwrap().team_id, team);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claimers_never_share_a_job() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("claims.db").display());
    let queue = JobQueue::connect(&url).await.unwrap();
    let team = queue.register_team("team", "10.0.0.1").await.unwrap();

    for _ in 0..10 {
        let queue_id = queue.enqueue(team).await.unwrap();

        let mut claimers = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let url = url.clone();
            claimers.spawn(async move { JobQueue::connect(&url).await.unwrap().fetch_queue().await });
        }

        let mut claimed = Vec::new();
        while let Some(result) = claimers.join_next().await {
            match result.unwrap() {
                Ok(job) => claimed.push(job.queue_id),
                Err(e) => assert!(
                    matches!(e, QueueError::NoJobAvailable | QueueError::ClaimRace { .. }),
                    "unexpected error: {e:?}"
                ),
            }
        }

        assert_eq!(claimed, vec![queue_id]);
        assert_eq!(queue.status_of(queue_id).await.unwrap(), JobStatus::Running);
    }
}
