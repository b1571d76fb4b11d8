use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use isuwitter_checker::prelude::IsuwitterFactory;
use yisubench::prelude::{init_logging, BenchRunner, BenchmarkerCli, Portal};
use yisubench_core::prelude::ShutdownHandle;
use yisubench_queue::prelude::JobQueue;
use yisubench_runner::prelude::AccountPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = BenchmarkerCli::parse();
    init_logging(cli.log_file.as_deref())?;

    let runner = match setup(&cli).await {
        Ok(runner) => runner,
        Err(e) => {
            log::error!("Benchmarker failed to start: {e:?}");
            return Err(e);
        }
    };

    let shutdown = ShutdownHandle::new();
    let listener = shutdown.new_listener();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Stopping once the current benchmark is saved");
                shutdown.shutdown();
            }
            Err(e) => log::error!("Failed to listen for ctrl-c: {e}"),
        }
    });

    runner.run(listener).await;
    Ok(())
}

async fn setup(cli: &BenchmarkerCli) -> anyhow::Result<BenchRunner> {
    let config = cli.bench_config();
    log::debug!("Running with {config:?}");

    let portal = Portal::connect(&cli.portal_host).await?;

    let names = std::fs::read_to_string(&cli.accounts)
        .with_context(|| format!("Failed to read accounts from {}", cli.accounts.display()))?;
    let accounts = AccountPool::parse(&names);
    log::info!("Loaded {} accounts", accounts.len());

    let queue = JobQueue::connect(&cli.database_url)
        .await
        .with_context(|| format!("Failed to open job queue at {}", cli.database_url))?;

    Ok(BenchRunner::new(
        queue,
        portal,
        accounts,
        Arc::new(IsuwitterFactory::new(config.clone())),
        config,
    ))
}
