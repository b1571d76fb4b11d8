use std::time::Duration;

/// Tunables for a benchmark run.
///
/// [`BenchConfig::default`] carries the values used in competition, the builder methods let the
/// process entry point and tests override them.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of workers kept active concurrently during the load phase.
    pub max_worker_count: usize,
    /// Upper bound of in-flight scores buffered per worker.
    pub max_checkers: usize,
    /// Time allowed for the target's `/initialize` endpoint.
    pub initialize_timeout: Duration,
    /// Wall-clock length of the load phase.
    pub bench_time_limit: Duration,
    /// Interval between two polls of the job queue.
    pub queue_check_interval: Duration,
    /// Per-request timeout. POSTs slower than this are penalised as slow.
    pub request_timeout: Duration,
    /// Age after which a running job is considered abandoned.
    pub lease_timeout: Duration,
    pub user_agent: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            max_worker_count: 5,
            max_checkers: 30,
            initialize_timeout: Duration::from_secs(10),
            bench_time_limit: Duration::from_secs(60),
            queue_check_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            lease_timeout: Duration::from_secs(120),
            user_agent: "YISUCON".to_string(),
        }
    }
}

impl BenchConfig {
    /// Builds a [`BenchConfig`] with the specified number of concurrent workers.
    pub fn max_worker_count(mut self, count: usize) -> Self {
        self.max_worker_count = count;
        self
    }

    /// Builds a [`BenchConfig`] with the specified per-worker score buffer.
    pub fn max_checkers(mut self, count: usize) -> Self {
        self.max_checkers = count;
        self
    }

    /// Builds a [`BenchConfig`] with the specified initialization timeout.
    pub fn initialize_timeout(mut self, timeout: Duration) -> Self {
        self.initialize_timeout = timeout;
        self
    }

    /// Builds a [`BenchConfig`] with the specified load phase duration.
    pub fn bench_time_limit(mut self, limit: Duration) -> Self {
        self.bench_time_limit = limit;
        self
    }

    /// Builds a [`BenchConfig`] with the specified queue polling interval.
    pub fn queue_check_interval(mut self, interval: Duration) -> Self {
        self.queue_check_interval = interval;
        self
    }

    /// Builds a [`BenchConfig`] with the specified request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds a [`BenchConfig`] with the specified lease timeout.
    pub fn lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }

    /// Builds a [`BenchConfig`] with the specified user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Capacity of the channel carrying per-action scores to the processor.
    pub fn result_capacity(&self) -> usize {
        (self.max_worker_count * self.max_checkers).max(1)
    }
}
