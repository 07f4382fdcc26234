use std::sync::Arc;

use {
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    teamwire_activity::InvokeResponse,
    teamwire_app::App,
    teamwire_config::ServerConfig,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GatewayState {
    pub app: Arc<App>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the webhook router (shared between production startup and tests).
pub fn build_router(app: Arc<App>, messages_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(messages_path, post(messages_handler))
        .with_state(GatewayState { app })
}

/// Bind `config.bind:config.port` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, app: Arc<App>) -> anyhow::Result<()> {
    let router = build_router(app, &config.messages_path);
    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        path = %config.messages_path,
        "listening for activities"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": state.app.routes().len(),
    }))
}

/// One activity, one turn. If the client goes away before the turn ends the
/// handler future is dropped and the guard cancels the turn.
async fn messages_handler(State(state): State<GatewayState>, body: Bytes) -> Response {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let response = state.app.process(&body, cancel).await;
    guard.disarm();
    into_http(response)
}

/// Status plus optional JSON body. An absent body is an empty response.
pub fn into_http(response: InvokeResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        warn!(status = response.status, "handler produced an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });
    match response.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn empty_body_maps_to_bare_status() {
        let response = into_http(InvokeResponse::ok());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn invalid_status_becomes_500() {
        let response = into_http(InvokeResponse::with_status(42).with_body(json!({})));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn body_keeps_handler_status() {
        let response = into_http(InvokeResponse::with_status(412).with_body(json!({"x": 1})));
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }
}
