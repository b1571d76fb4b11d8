mod error;
mod model;
mod queue;
mod schema;

pub mod prelude {
    pub use crate::error::{QueueError, QueueResult};
    pub use crate::model::{Job, JobStatus, ScoreRecord};
    pub use crate::queue::JobQueue;
    pub use crate::schema::init_schema;
}
