use crate::account::Account;
use crate::scenario::Scenario;

/// Builds the scenarios a worker runs against a target application.
///
/// Every call must return a scenario backed by a fresh session, so that cookies, cached responses
/// and per-scenario state never leak from one run to the next.
pub trait CheckerFactory: Send + Sync + 'static {
    /// Validation scenario run once, before the load phase starts.
    fn new_init_scenario(&self, host: &str, account: &Account) -> anyhow::Result<Scenario>;

    /// Load scenario run repeatedly by every worker.
    fn new_default_scenario(&self, host: &str, account: &Account) -> anyhow::Result<Scenario>;
}
