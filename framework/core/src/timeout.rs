/// Returned by a worker whose run was cut short by the end of the load phase.
///
/// This is expected for every worker that is still active when the benchmark deadline passes,
/// so callers should log it rather than treat it as a failure of the target.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct WorkerTimedOutError {
    msg: String,
}

impl Default for WorkerTimedOutError {
    fn default() -> Self {
        Self {
            msg: "worker time out".to_string(),
        }
    }
}
