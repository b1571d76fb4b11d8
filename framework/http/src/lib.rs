mod cache;
mod error;
mod response;
mod session;

pub mod prelude {
    pub use crate::cache::{Cache, CacheData, CacheKey};
    pub use crate::error::{CacheError, SessionError};
    pub use crate::response::Response;
    pub use crate::session::Session;

    pub use reqwest::{Method, StatusCode};
}
