//! Turn processing for Teams bots.
//!
//! An inbound activity runs through the [`Pipeline`] of middleware and then
//! through the [`App`]'s route table. Matching routes are chained: each
//! handler may call [`TurnContext::next`] to hand the turn to the next
//! matching route.

pub mod app;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod route;
pub mod sender;
pub mod sign_in;

pub use {
    app::{App, AppBuilder, AppOptions},
    context::TurnContext,
    dispatch::Router,
    error::{Error, Result},
    middleware::{AccessPolicy, AccessPolicyMiddleware, LoggingMiddleware},
    pipeline::{Middleware, Next, Pipeline, TurnHandler, TurnRequest, from_fn},
    route::{Route, RouteClass, RouteTable},
    sender::{
        ActivityObserver, ActivitySender, ConversationParameters, Outbound, SignInResource,
        TokenResponse, UserTokenClient,
    },
    sign_in::{SignInOptions, SignInOutcome, TokenExchangeState},
};
