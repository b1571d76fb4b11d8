use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use yisubench_core::prelude::BenchConfig;

#[derive(Debug, Parser)]
#[command(about, long_about = None)]
pub struct BenchmarkerCli {
    /// Host of the portal, notified when a benchmark starts and when it finishes
    #[clap(long, env = "YJ_ISUCON_PORTAL_HOST")]
    pub portal_host: String,

    /// Database holding the job queue and the scores
    #[clap(long, env = "YJ_ISUCON_DATABASE_URL", default_value = "sqlite://benchmarker.db")]
    pub database_url: String,

    /// File listing the account names seeded into the target, separated by commas or newlines
    #[clap(long, env = "YJ_ISUCON_ACCOUNTS", default_value = "accounts.txt")]
    pub accounts: PathBuf,

    /// Also append logs to this file. Parent directories are created if needed.
    #[clap(long, env = "YJ_ISUCON_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// The number of workers kept busy during the load phase
    #[clap(long)]
    pub workers: Option<usize>,

    /// The number of scores each worker may have waiting to be counted
    #[clap(long)]
    pub checkers: Option<usize>,

    /// Seconds allowed for the target's initialize endpoint
    #[clap(long)]
    pub initialize_timeout: Option<u64>,

    /// Length of the load phase, in seconds
    #[clap(long)]
    pub duration: Option<u64>,

    /// Milliseconds between two polls of the job queue
    #[clap(long)]
    pub poll_interval: Option<u64>,

    /// Per-request timeout in seconds. Slower POST requests are penalised.
    #[clap(long)]
    pub request_timeout: Option<u64>,

    /// Seconds after which a running job with no result is handed out again
    #[clap(long)]
    pub lease_timeout: Option<u64>,

    /// User agent sent with every request to the target
    #[clap(long)]
    pub user_agent: Option<String>,
}

impl BenchmarkerCli {
    /// The default configuration with every override given on the command line applied.
    pub fn bench_config(&self) -> BenchConfig {
        let mut config = BenchConfig::default();

        if let Some(workers) = self.workers {
            config = config.max_worker_count(workers);
        }
        if let Some(checkers) = self.checkers {
            config = config.max_checkers(checkers);
        }
        if let Some(secs) = self.initialize_timeout {
            config = config.initialize_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.duration {
            config = config.bench_time_limit(Duration::from_secs(secs));
        }
        if let Some(millis) = self.poll_interval {
            config = config.queue_check_interval(Duration::from_millis(millis));
        }
        if let Some(secs) = self.request_timeout {
            config = config.request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.lease_timeout {
            config = config.lease_timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent.clone());
        }

        config
    }
}
