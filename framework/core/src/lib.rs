mod config;
mod score;
mod shutdown;
mod timeout;

pub mod prelude {
    pub use crate::config::BenchConfig;
    pub use crate::score::BenchScore;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle};
    pub use crate::timeout::WorkerTimedOutError;
}
