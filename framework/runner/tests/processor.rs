use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use yisubench_core::prelude::BenchConfig;
use yisubench_runner::prelude::{
    Account, AccountPool, Action, CheckerFactory, Processor, Scenario, ERROR_PENALTY,
};

type ScenarioFn = dyn Fn() -> Vec<Action> + Send + Sync;

/// Hands out load scenarios until its budget is spent, then refuses.
struct FakeFactory {
    init: Box<ScenarioFn>,
    load: Box<ScenarioFn>,
    budget: Option<usize>,
    created: AtomicUsize,
}

impl FakeFactory {
    fn new(init: impl Fn() -> Vec<Action> + Send + Sync + 'static) -> Self {
        Self {
            init: Box::new(init),
            load: Box::new(Vec::<Action>::new),
            budget: None,
            created: AtomicUsize::new(0),
        }
    }

    fn load(mut self, load: impl Fn() -> Vec<Action> + Send + Sync + 'static) -> Self {
        self.load = Box::new(load);
        self
    }

    fn budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }
}

impl CheckerFactory for FakeFactory {
    fn new_init_scenario(&self, _host: &str, _account: &Account) -> anyhow::Result<Scenario> {
        Ok((self.init)().into_iter().collect())
    }

    fn new_default_scenario(&self, _host: &str, _account: &Account) -> anyhow::Result<Scenario> {
        let created = self.created.fetch_add(1, Ordering::SeqCst);
        if self.budget.is_some_and(|budget| created >= budget) {
            anyhow::bail!("scenario budget spent");
        }
        Ok((self.load)().into_iter().collect())
    }
}

fn accounts() -> AccountPool {
    AccountPool::from_names(["alice", "bob", "carol", "dave"])
}

fn sleepy_get(name: &str, delay: Duration, points: i64) -> Action {
    Action::get(name, move || async move {
        tokio::time::sleep(delay).await;
        Ok(points)
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn load_phase_is_bounded_by_the_deadline() {
    let factory = Arc::new(FakeFactory::new(Vec::new).load(|| {
        vec![
            sleepy_get("Step", Duration::from_millis(10), 1),
            sleepy_get("Step", Duration::from_millis(10), 1),
        ]
    }));
    let config = BenchConfig::default()
        .max_worker_count(2)
        .bench_time_limit(Duration::from_millis(200));

    let processor = Processor::new("target", &accounts(), factory.clone(), config).unwrap();

    let start = Instant::now();
    let score = processor.run().await;
    let elapsed = start.elapsed();

    assert!(score.points > 0, "expected a positive score, got {score:?}");
    assert!(score.errors.is_empty());
    assert!(
        elapsed < Duration::from_millis(200 + 300),
        "run took {elapsed:?}"
    );
    // Finished workers are replaced while the deadline has not passed.
    assert!(factory.created.load(Ordering::SeqCst) > 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_initialization_aborts_with_zero() {
    let factory = Arc::new(
        FakeFactory::new(|| {
            vec![
                Action::get("InitialCheck", || async {
                    Err(anyhow::anyhow!("initialize failed"))
                }),
                sleepy_get("FaviconCheck", Duration::ZERO, 1),
            ]
        })
        .load(|| vec![sleepy_get("Step", Duration::ZERO, 100)]),
    );
    let config = BenchConfig::default().bench_time_limit(Duration::from_secs(30));

    let start = Instant::now();
    let score = Processor::new("target", &accounts(), factory.clone(), config)
        .unwrap()
        .run()
        .await;

    assert_eq!(score.points, 0);
    assert_eq!(score.error_message(), "initialize failed\n");
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn total_is_the_sum_of_every_score() {
    let factory = Arc::new(
        FakeFactory::new(|| {
            vec![
                sleepy_get("InitialCheck", Duration::ZERO, 2),
                sleepy_get("FaviconCheck", Duration::ZERO, 2),
            ]
        })
        .load(|| {
            vec![
                sleepy_get("PageLoadCheck", Duration::from_millis(1), 5),
                Action::post("TweetCheck", || async { Ok(4) }),
                Action::get("HashTagCheck", || async { Err(anyhow::anyhow!("boom")) }),
                sleepy_get("FaviconCheck", Duration::from_millis(1), 0),
            ]
        })
        .budget(6),
    );
    let config = BenchConfig::default()
        .max_worker_count(3)
        .bench_time_limit(Duration::from_millis(500));

    let score = Processor::new("target", &accounts(), factory, config)
        .unwrap()
        .run()
        .await;

    // init: 2 + 2, each load scenario: 5 + 2 * 4 - 10 + 0
    assert_eq!(score.points, 4 + 6 * (5 + 8 + ERROR_PENALTY));
    assert_eq!(score.errors.len(), 6);
    assert_eq!(score.error_message(), "boom\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn negative_total_is_clamped_at_the_end() {
    let factory = Arc::new(
        FakeFactory::new(Vec::new)
            .load(|| {
                vec![Action::get("PageLoadCheck", || async {
                    Err(anyhow::anyhow!("page is broken"))
                })]
            })
            .budget(4),
    );
    let config = BenchConfig::default()
        .max_worker_count(2)
        .bench_time_limit(Duration::from_millis(200));

    let score = Processor::new("target", &accounts(), factory, config)
        .unwrap()
        .run()
        .await;

    assert_eq!(score.points, 0);
    assert_eq!(score.errors.len(), 4);
}

#[test]
fn empty_account_pool_is_rejected() {
    let factory = Arc::new(FakeFactory::new(Vec::new));
    let result = Processor::new(
        "target",
        &AccountPool::default(),
        factory,
        BenchConfig::default(),
    );
    assert_eq!(
        result.err().map(|e| e.to_string()).as_deref(),
        Some("user data not found")
    );
}
