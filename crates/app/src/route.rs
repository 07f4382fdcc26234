//! Route entries and the ordered table they live in.

use std::{fmt, future::Future, sync::Arc};

use {
    futures::{FutureExt, future::BoxFuture},
    teamwire_activity::{Activity, InvokeResponse},
};

use crate::{context::TurnContext, error::Result};

/// System routes run before every user route, whatever the order they were
/// registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    System,
    User,
}

pub type Selector = Arc<dyn Fn(&Activity) -> bool + Send + Sync>;
pub type HandlerFuture = BoxFuture<'static, Result<Option<InvokeResponse>>>;
pub type Handler = Arc<dyn Fn(TurnContext) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
pub struct Route {
    name: String,
    class: RouteClass,
    selector: Selector,
    handler: Handler,
}

impl Route {
    /// `selector` sees the undiscriminated activity and must be pure.
    pub fn new<S, H, Fut>(name: impl Into<String>, class: RouteClass, selector: S, handler: H) -> Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
        H: Fn(TurnContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            class,
            selector: Arc::new(selector),
            handler: Arc::new(move |ctx: TurnContext| -> HandlerFuture { handler(ctx).boxed() }),
        }
    }

    pub fn user<S, H, Fut>(name: impl Into<String>, selector: S, handler: H) -> Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
        H: Fn(TurnContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        Self::new(name, RouteClass::User, selector, handler)
    }

    pub fn system<S, H, Fut>(name: impl Into<String>, selector: S, handler: H) -> Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
        H: Fn(TurnContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        Self::new(name, RouteClass::System, selector, handler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> RouteClass {
        self.class
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        (self.selector)(activity)
    }

    pub(crate) fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// Routes in dispatch order: system routes first, then user routes, each
/// group in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, route: Route) {
        match route.class {
            RouteClass::User => self.routes.push(route),
            RouteClass::System => {
                let at = self
                    .routes
                    .iter()
                    .position(|r| r.class == RouteClass::User)
                    .unwrap_or(self.routes.len());
                self.routes.insert(at, route);
            },
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(Route::name).collect()
    }

    /// First route at or after `start` whose selector accepts `activity`.
    pub fn first_match(&self, activity: &Activity, start: usize) -> Option<(usize, &Route)> {
        self.routes
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, route)| route.matches(activity))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        teamwire_activity::{MessageActivity, TypingActivity},
    };

    fn route(name: &str, class: RouteClass) -> Route {
        Route::new(name, class, |_| true, |_ctx| async { Ok(None) })
    }

    #[test]
    fn system_routes_move_ahead_stably() {
        let mut table = RouteTable::new();
        table.register(route("user/b", RouteClass::User));
        table.register(route("system/a", RouteClass::System));
        table.register(route("user/c", RouteClass::User));
        table.register(route("system/d", RouteClass::System));
        assert_eq!(table.names(), vec!["system/a", "system/d", "user/b", "user/c"]);
    }

    #[test]
    fn first_match_respects_start() {
        let mut table = RouteTable::new();
        table.register(Route::user(
            "message",
            |a: &Activity| a.kind() == "message",
            |_ctx| async { Ok(None) },
        ));
        table.register(route("any", RouteClass::User));

        let message: Activity = MessageActivity::new("hi").into();
        let typing: Activity = TypingActivity::new().into();
        assert_eq!(table.first_match(&message, 0).map(|(i, _)| i), Some(0));
        assert_eq!(table.first_match(&message, 1).map(|(i, _)| i), Some(1));
        assert_eq!(table.first_match(&typing, 0).map(|(i, _)| i), Some(1));
        assert!(table.first_match(&typing, 2).is_none());
    }
}
