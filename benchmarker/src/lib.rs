pub mod cli;
mod logging;
mod portal;
mod runner;

pub mod prelude {
    pub use crate::cli::BenchmarkerCli;
    pub use crate::logging::init_logging;
    pub use crate::portal::{Portal, BENCH_DONE, BENCH_RUNNING};
    pub use crate::runner::{normalize_host, BenchRunner};
}
