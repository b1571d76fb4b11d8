mod account;
mod action;
mod checker;
mod processor;
mod ring;
mod scenario;
mod score;
mod worker;

pub mod prelude {
    pub use crate::account::{password_for, Account, AccountPool};
    pub use crate::action::{Action, ActionResult};
    pub use crate::checker::CheckerFactory;
    pub use crate::processor::Processor;
    pub use crate::ring::WorkerRing;
    pub use crate::scenario::{
        AssetChecks, Scenario, ScenarioTemplate, FAKE_LOGIN_COUNT, PAGING_COUNT,
    };
    pub use crate::score::{
        calc_score, ErrorKind, Score, ERROR_PENALTY, SLOW_POST_PENALTY, TIMEOUT_PENALTY,
    };
    pub use crate::worker::Worker;
}
