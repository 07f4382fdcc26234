//! Turn middleware: an ordered chain wrapped around route dispatch.
//!
//! Each middleware receives the turn and a [`Next`] handle. Calling
//! [`Next::run`] passes the turn inward (to the next middleware, or to the
//! terminal handler after the last one); returning without calling it
//! short-circuits everything inside. There is no priority at this layer:
//! middleware run in the order they were added.

use std::sync::Arc;

use {
    async_trait::async_trait,
    futures::future::BoxFuture,
    teamwire_activity::{Activity, InvokeResponse},
    tokio_util::sync::CancellationToken,
};

use crate::error::{Error, Result};

/// The inbound activity and the turn's cancellation signal.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub activity: Arc<Activity>,
    pub cancel: CancellationToken,
}

impl TurnRequest {
    pub fn new(activity: Activity, cancel: CancellationToken) -> Self {
        Self {
            activity: Arc::new(activity),
            cancel,
        }
    }
}

/// Innermost stage of the pipeline.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle(&self, turn: TurnRequest) -> Result<Option<InvokeResponse>>;
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn on_turn(&self, turn: TurnRequest, next: Next<'_>) -> Result<Option<InvokeResponse>>;
}

/// The rest of the chain, from the current middleware's point of view.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn TurnHandler,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], terminal: &'a dyn TurnHandler) -> Self {
        Self { chain, terminal }
    }

    /// Run the remainder of the chain. A turn that is already cancelled stops
    /// here with [`Error::Cancelled`].
    pub async fn run(self, turn: TurnRequest) -> Result<Option<InvokeResponse>> {
        if turn.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.chain.split_first() {
            Some((head, rest)) => head.on_turn(turn, Next::new(rest, self.terminal)).await,
            None => self.terminal.handle(turn).await,
        }
    }
}

#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    pub async fn run(
        &self,
        turn: TurnRequest,
        terminal: &dyn TurnHandler,
    ) -> Result<Option<InvokeResponse>> {
        Next::new(&self.middleware, terminal).run(turn).await
    }
}

/// Middleware built from a closure, see [`from_fn`].
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

/// Wrap a closure as middleware.
///
/// ```ignore
/// pipeline.push(Arc::new(from_fn("audit", |turn, next| {
///     async move { next.run(turn).await }.boxed()
/// })));
/// ```
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(TurnRequest, Next<'a>) -> BoxFuture<'a, Result<Option<InvokeResponse>>>
        + Send
        + Sync,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(TurnRequest, Next<'a>) -> BoxFuture<'a, Result<Option<InvokeResponse>>>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_turn(&self, turn: TurnRequest, next: Next<'_>) -> Result<Option<InvokeResponse>> {
        (self.f)(turn, next).await
    }
}
