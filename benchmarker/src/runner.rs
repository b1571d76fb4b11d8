use std::sync::Arc;

use yisubench_core::prelude::{BenchConfig, BenchScore, DelegatedShutdownListener};
use yisubench_queue::prelude::{Job, JobQueue};
use yisubench_runner::prelude::{AccountPool, CheckerFactory, Processor};

use crate::portal::Portal;

/// Claims jobs from the queue and benchmarks them one at a time, until shut down.
pub struct BenchRunner {
    queue: JobQueue,
    portal: Portal,
    accounts: AccountPool,
    factory: Arc<dyn CheckerFactory>,
    config: BenchConfig,
}

impl BenchRunner {
    pub fn new(
        queue: JobQueue,
        portal: Portal,
        accounts: AccountPool,
        factory: Arc<dyn CheckerFactory>,
        config: BenchConfig,
    ) -> Self {
        Self {
            queue,
            portal,
            accounts,
            factory,
            config,
        }
    }

    /// Returns once shutdown is signalled. A benchmark in progress is completed and saved first.
    pub async fn run(&self, mut shutdown: DelegatedShutdownListener) {
        while let Some(job) = self
            .queue
            .wait_for_job(
                self.config.queue_check_interval,
                self.config.lease_timeout,
                &mut shutdown,
            )
            .await
        {
            self.bench(&job).await;
        }

        log::info!("Benchmarker stopped");
    }

    /// Benchmark a claimed job and save its score.
    ///
    /// Portal failures end up in the score's errors. When the portal could not be told that the
    /// benchmark started, the target is not benchmarked at all.
    pub async fn bench(&self, job: &Job) -> BenchScore {
        log::info!("BENCH team#{} Started...", job.team_id);

        let mut score = match self.portal.bench_started(job.team_id).await {
            Ok(()) => self.process(normalize_host(&job.host)).await,
            Err(e) => {
                log::warn!("Start hook for team#{} failed: {e:?}", job.team_id);
                BenchScore::failed(e.to_string())
            }
        };

        if let Err(e) = self.portal.bench_finished(job.team_id).await {
            log::warn!("Finish hook for team#{} failed: {e:?}", job.team_id);
            score.record_error(e.to_string());
        }

        if let Err(e) = self
            .queue
            .save_result(job.team_id, job.queue_id, &score)
            .await
        {
            log::error!(
                "Failed to save the result of team#{} (queue {}): {e}",
                job.team_id,
                job.queue_id
            );
        }

        log::info!("BENCH team#{} Done.", job.team_id);
        score
    }

    async fn process(&self, host: &str) -> BenchScore {
        let processor = match Processor::new(
            host,
            &self.accounts,
            self.factory.clone(),
            self.config.clone(),
        ) {
            Ok(processor) => processor,
            Err(e) => {
                log::warn!("Cannot benchmark {host}: {e:?}");
                return BenchScore::failed(e.to_string());
            }
        };

        let score = processor.run().await;
        log::info!("Score : {}", score.points);
        score
    }
}

/// Team hosts are registered with or without a scheme, sessions want a bare `host[:port]`.
pub fn normalize_host(host: &str) -> &str {
    host.strip_prefix("http://")
        .or_else(|| host.strip_prefix("https://"))
        .unwrap_or(host)
}
