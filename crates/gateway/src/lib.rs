//! HTTP entry point: the webhook the channel posts activities to.

pub mod server;

pub use server::{GatewayState, build_router, into_http, serve};
