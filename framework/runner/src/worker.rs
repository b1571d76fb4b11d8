use std::sync::Arc;

use tokio::sync::mpsc;
use yisubench_core::prelude::{DelegatedShutdownListener, WorkerTimedOutError};

use crate::account::Account;
use crate::checker::CheckerFactory;
use crate::score::Score;

/// One simulated user, bound to an account and a target host.
#[derive(Debug, Clone)]
pub struct Worker {
    account: Account,
    host: Arc<str>,
}

impl Worker {
    pub fn new(account: Account, host: Arc<str>) -> Self {
        Self { account, host }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Run one load scenario to exhaustion, publishing a [Score] per completed action.
    ///
    /// A zero score is published first, then each action's score is published before the next
    /// action starts. Publishing blocks while `results` is full. At most one action is in flight.
    ///
    /// Returns [WorkerTimedOutError] if shutdown is signalled or the receiving side is dropped
    /// before the scenario is exhausted. An action already in flight is allowed to finish and its
    /// score is discarded.
    pub async fn run(
        &self,
        factory: &dyn CheckerFactory,
        mut shutdown: DelegatedShutdownListener,
        results: mpsc::Sender<Score>,
    ) -> anyhow::Result<()> {
        let mut scenario = factory.new_default_scenario(&self.host, &self.account)?;
        let mut pending = Score::zero();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait_for_shutdown() => {
                    return Err(WorkerTimedOutError::default().into());
                }
                sent = results.send(pending) => {
                    if sent.is_err() {
                        return Err(WorkerTimedOutError::default().into());
                    }
                }
            }

            let Some(action) = scenario.pop_front() else {
                log::trace!("Scenario finished for {}", self.account.name);
                return Ok(());
            };

            let mut in_flight = tokio::spawn(action.score());

            pending = tokio::select! {
                biased;

                _ = shutdown.wait_for_shutdown() => {
                    // Let the request finish so the session is not torn down mid-flight.
                    let _ = in_flight.await;
                    return Err(WorkerTimedOutError::default().into());
                }
                joined = &mut in_flight => match joined {
                    Ok(score) => score,
                    Err(e) => {
                        log::error!("Action {} panicked: {e}", action.name());
                        Score::failed(&anyhow::anyhow!("{} panicked", action.name()))
                    }
                },
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use yisubench_core::prelude::ShutdownHandle;

    use super::*;
    use crate::action::Action;
    use crate::scenario::Scenario;

    struct CountingFactory {
        actions: usize,
        delay: Duration,
        invoked: Arc<AtomicUsize>,
    }

    impl CheckerFactory for CountingFactory {
        fn new_init_scenario(&self, _host: &str, _account: &Account) -> anyhow::Result<Scenario> {
            Ok(Scenario::default())
        }

        fn new_default_scenario(&self, _host: &str, _account: &Account) -> anyhow::Result<Scenario> {
            Ok((0..self.actions)
                .map(|_| {
                    let delay = self.delay;
                    let invoked = self.invoked.clone();
                    Action::get("Step", move || {
                        let invoked = invoked.clone();
                        async move {
                            tokio::time::sleep(delay).await;
                            invoked.fetch_add(1, Ordering::SeqCst);
                            Ok(1)
                        }
                    })
                })
                .collect())
        }
    }

    fn worker() -> Worker {
        Worker::new(Account::new("alice"), Arc::from("target"))
    }

    #[tokio::test]
    async fn publishes_zero_then_one_score_per_action() {
        let factory = CountingFactory {
            actions: 3,
            delay: Duration::ZERO,
            invoked: Arc::default(),
        };
        let (tx, mut rx) = mpsc::channel(16);

        worker()
            .run(&factory, ShutdownHandle::new().new_listener(), tx)
            .await
            .unwrap();

        let mut points = Vec::new();
        while let Some(score) = rx.recv().await {
            points.push(score.points);
        }
        assert_eq!(points, vec![0, 1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_scenario_times_out() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            actions: 100,
            delay: Duration::from_millis(10),
            invoked: invoked.clone(),
        };
        let (tx, mut rx) = mpsc::channel(256);
        let shutdown = ShutdownHandle::new();
        shutdown.shutdown_after(Duration::from_millis(35));

        let err = worker()
            .run(&factory, shutdown.new_listener(), tx)
            .await
            .unwrap_err();
        assert!(err.is::<WorkerTimedOutError>());

        let mut published = 0;
        while rx.recv().await.is_some() {
            published += 1;
        }
        // The zero score plus every action that completed before the signal.
        let invoked = invoked.load(Ordering::SeqCst);
        assert!(invoked < 100);
        assert!(published <= invoked + 1);
    }

    #[tokio::test]
    async fn dropped_receiver_stops_the_worker() {
        let factory = CountingFactory {
            actions: 3,
            delay: Duration::ZERO,
            invoked: Arc::default(),
        };
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = worker()
            .run(&factory, ShutdownHandle::new().new_listener(), tx)
            .await
            .unwrap_err();
        assert!(err.is::<WorkerTimedOutError>());
    }
}
