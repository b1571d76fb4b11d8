use std::sync::Arc;

use crate::account::Account;
use crate::worker::Worker;

/// Fixed set of workers, one per account, handed out round-robin.
#[derive(Debug)]
pub struct WorkerRing {
    workers: Vec<Worker>,
    cursor: usize,
}

impl WorkerRing {
    pub fn new(host: &str, accounts: Vec<Account>) -> anyhow::Result<Self> {
        if accounts.is_empty() {
            anyhow::bail!("user data not found");
        }

        let host: Arc<str> = Arc::from(host);
        Ok(Self {
            workers: accounts
                .into_iter()
                .map(|account| Worker::new(account, host.clone()))
                .collect(),
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn current(&self) -> &Worker {
        &self.workers[self.cursor]
    }

    /// Move to the next slot and return its worker.
    pub fn advance(&mut self) -> &Worker {
        self.cursor = (self.cursor + 1) % self.workers.len();
        &self.workers[self.cursor]
    }
}
