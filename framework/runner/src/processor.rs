use std::sync::Arc;

use tokio::sync::{mpsc, Barrier};
use tokio::task::JoinSet;
use tokio::time::Instant;
use yisubench_core::prelude::{
    BenchConfig, BenchScore, DelegatedShutdownListener, ShutdownHandle, WorkerTimedOutError,
};

use crate::account::AccountPool;
use crate::checker::CheckerFactory;
use crate::ring::WorkerRing;
use crate::score::Score;
use crate::worker::Worker;

/// Drives one benchmark run against a single host.
///
/// The run has two phases. The initialization scenario is run once, sequentially, and any failure
/// ends the run with a zero score. Then `max_worker_count` workers are released together and kept
/// busy until `bench_time_limit` has elapsed. A worker that exhausts its scenario is replaced by
/// the next worker in the ring straight away.
pub struct Processor {
    ring: WorkerRing,
    factory: Arc<dyn CheckerFactory>,
    config: BenchConfig,
}

impl Processor {
    pub fn new(
        host: &str,
        accounts: &AccountPool,
        factory: Arc<dyn CheckerFactory>,
        config: BenchConfig,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            ring: WorkerRing::new(host, accounts.shuffled()?)?,
            factory,
            config,
        })
    }

    pub async fn run(mut self) -> BenchScore {
        let mut total = BenchScore::new();

        match self.initial_process().await {
            Ok(points) => total.add(points, None),
            Err(e) => {
                log::warn!("Initial process failed: {e:?}");
                return BenchScore::failed(e.to_string());
            }
        }

        let worker_count = self.config.max_worker_count.max(1);
        let (result_tx, mut result_rx) = mpsc::channel::<Score>(self.config.result_capacity());
        let (done_tx, mut done_rx) = mpsc::channel::<()>(worker_count);
        let shutdown = ShutdownHandle::new();
        let start_barrier = Arc::new(Barrier::new(worker_count + 1));

        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            let worker = self.ring.advance().clone();
            workers.spawn(work(
                worker,
                self.factory.clone(),
                Some(start_barrier.clone()),
                shutdown.new_listener(),
                result_tx.clone(),
                done_tx.clone(),
            ));
        }

        // Returns once every worker is parked on the barrier, and releases them all.
        start_barrier.wait().await;

        let start = Instant::now();
        let deadline = tokio::time::sleep(self.config.bench_time_limit);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = &mut deadline => break,
                Some(()) = done_rx.recv() => {
                    reap_finished(&mut workers);
                    let worker = self.ring.advance().clone();
                    workers.spawn(work(
                        worker,
                        self.factory.clone(),
                        None,
                        shutdown.new_listener(),
                        result_tx.clone(),
                        done_tx.clone(),
                    ));
                }
                Some(score) = result_rx.recv() => {
                    total.add(score.points, score.error);
                }
            }
        }

        log::info!("Load phase finished after {:?}", start.elapsed());

        shutdown.shutdown();
        drop(result_rx);
        drop(done_rx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("Worker task failed: {e}");
            }
        }

        total.finalize();
        total
    }

    /// Run the initialization scenario. The first failing action aborts the run.
    async fn initial_process(&self) -> anyhow::Result<i64> {
        let worker = self.ring.current();
        let mut scenario = self
            .factory
            .new_init_scenario(worker.host(), worker.account())?;

        let mut points = 0;
        while let Some(action) = scenario.pop_front() {
            let score = action.score().await;
            if let Some(error) = score.error {
                anyhow::bail!(error);
            }
            points += score.points;
        }

        Ok(points)
    }
}

/// Drop the tasks of workers that already returned, so replacements do not pile up in the set.
fn reap_finished(workers: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while let Some(joined) = workers.try_join_next() {
        if let Err(e) = joined {
            log::error!("Worker task failed: {e}");
        }
        reaped += 1;
    }
    reaped
}

async fn work(
    worker: Worker,
    factory: Arc<dyn CheckerFactory>,
    start_barrier: Option<Arc<Barrier>>,
    shutdown: DelegatedShutdownListener,
    results: mpsc::Sender<Score>,
    done: mpsc::Sender<()>,
) {
    if let Some(barrier) = start_barrier {
        barrier.wait().await;
    }

    match worker.run(factory.as_ref(), shutdown, results).await {
        Ok(()) => {
            // Fails once the load phase is over, nothing to replace then.
            let _ = done.send(()).await;
        }
        Err(e) if e.is::<WorkerTimedOutError>() => {
            log::debug!("Worker for {}: {e}", worker.account().name);
        }
        Err(e) => {
            log::warn!("Worker for {} failed: {e:?}", worker.account().name);
        }
    }
}
