use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use yisubench_http::prelude::Method;

use crate::score::{calc_score, Score};

/// Outcome of one action: positive points on success, zero for a soft failure.
pub type ActionResult = anyhow::Result<i64>;

type Operation = Arc<dyn Fn() -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// One scored interaction with the target.
///
/// Actions are cheap to clone and never mutated once built, so the same action can appear many
/// times in a [crate::prelude::Scenario].
#[derive(Clone)]
pub struct Action {
    method: Method,
    name: String,
    operation: Operation,
}

impl Action {
    pub fn new<F, Fut>(method: Method, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self {
            method,
            name: name.into(),
            operation: Arc::new(move || operation().boxed()),
        }
    }

    pub fn get<F, Fut>(name: impl Into<String>, operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self::new(Method::GET, name, operation)
    }

    pub fn post<F, Fut>(name: impl Into<String>, operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self::new(Method::POST, name, operation)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the operation without scoring it.
    pub fn invoke(&self) -> BoxFuture<'static, ActionResult> {
        (self.operation)()
    }

    /// Run the operation and convert its outcome into points.
    pub fn score(&self) -> BoxFuture<'static, Score> {
        let method = self.method.clone();
        let name = self.name.clone();
        let operation = self.invoke();
        async move { calc_score(&method, &name, operation).await }.boxed()
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("method", &self.method)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
