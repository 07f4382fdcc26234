//! Route dispatch with handler continuation.
//!
//! Dispatch scans the route snapshot from a cursor for the first route whose
//! selector matches, and runs its handler. A handler can hand the turn on
//! with [`TurnContext::next`](crate::TurnContext::next), which repeats the
//! scan from the route after it. The turn result is the handler's own value
//! when it returns one; otherwise whatever its continuation produced; and
//! `None` when no route matched at all.

use std::sync::{Arc, RwLock};

use {
    futures::{FutureExt, future::BoxFuture},
    teamwire_activity::InvokeResponse,
    tokio::sync::Mutex,
    tracing::{Instrument, debug, warn},
};

use crate::{
    context::{TurnContext, TurnState},
    error::{Error, Result},
    route::{Route, RouteTable},
};

/// Shared route table. Registration swaps in a new snapshot; a turn keeps
/// the snapshot it started with.
#[derive(Debug, Default)]
pub struct Router {
    table: RwLock<Arc<RouteTable>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, route: Route) {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        debug!(route = route.name(), class = ?route.class(), "registering route");
        Arc::make_mut(&mut table).register(route);
    }

    pub fn snapshot(&self) -> Arc<RouteTable> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&table)
    }
}

enum NextState {
    Pending,
    Done(Option<InvokeResponse>),
    Failed,
}

/// The rest of the route chain after one matched route.
pub(crate) struct Continuation {
    start: usize,
    state: Mutex<NextState>,
}

impl Continuation {
    fn new(start: usize) -> Self {
        Self {
            start,
            state: Mutex::new(NextState::Pending),
        }
    }

    /// Dispatch the remaining routes once. Later calls return the first
    /// outcome without running anything again.
    pub(crate) async fn run(&self, turn: &Arc<TurnState>) -> Result<Option<InvokeResponse>> {
        let mut state = self.state.lock().await;
        match &*state {
            NextState::Pending => {},
            NextState::Done(response) => {
                warn!(start = self.start, "next() called more than once; reusing first result");
                return Ok(response.clone());
            },
            NextState::Failed => {
                warn!(start = self.start, "next() called again after it failed");
                return Err(Error::handler("route continuation already failed"));
            },
        }
        let result = dispatch(Arc::clone(turn), self.start).await;
        *state = match &result {
            Ok(response) => NextState::Done(response.clone()),
            Err(_) => NextState::Failed,
        };
        result
    }

    async fn settled(&self) -> Option<InvokeResponse> {
        match &*self.state.lock().await {
            NextState::Done(response) => response.clone(),
            NextState::Pending | NextState::Failed => None,
        }
    }
}

/// Run the first route matching at or after `start`.
pub(crate) fn dispatch(
    turn: Arc<TurnState>,
    start: usize,
) -> BoxFuture<'static, Result<Option<InvokeResponse>>> {
    async move {
        if turn.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let Some((index, route)) = turn.routes.first_match(&turn.activity, start) else {
            debug!(start, "no route matched");
            return Ok(None);
        };
        debug!(route = route.name(), index, "route matched");
        let handler = route.handler();

        let continuation = Arc::new(Continuation::new(index + 1));
        let ctx = TurnContext::new(Arc::clone(&turn), Arc::clone(&continuation));
        let span = turn.span.clone();
        let own = tokio::select! {
            biased;
            () = turn.cancel.cancelled() => return Err(Error::Cancelled),
            result = handler(ctx).instrument(span) => result?,
        };
        match own {
            Some(response) => Ok(Some(response)),
            None => Ok(continuation.settled().await),
        }
    }
    .boxed()
}
