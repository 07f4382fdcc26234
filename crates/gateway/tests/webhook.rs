#![allow(clippy::unwrap_used, clippy::expect_used)]
//! The webhook served over a real socket.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    teamwire_activity::{
        Activity, AdaptiveCardActionResponse, ConversationAccount, ConversationReference,
        MessageActivity, invoke::adaptive_card::ActionActivity,
    },
    teamwire_app::{ActivitySender, App, ConversationParameters, Result},
    teamwire_gateway::build_router,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
};

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<Activity>>,
}

#[async_trait]
impl ActivitySender for RecordingSender {
    async fn send(
        &self,
        activity: Activity,
        _reference: &ConversationReference,
        _is_targeted: bool,
        _cancel: &CancellationToken,
    ) -> Result<Activity> {
        self.sent.lock().unwrap().push(activity.clone());
        Ok(activity)
    }

    async fn create_conversation(
        &self,
        _reference: &ConversationReference,
        _parameters: ConversationParameters,
        _cancel: &CancellationToken,
    ) -> Result<ConversationAccount> {
        Ok(ConversationAccount::new("a:direct"))
    }
}

/// Start the gateway on an ephemeral port with an echo bot behind it.
async fn start() -> (SocketAddr, Arc<RecordingSender>) {
    let sender = Arc::new(RecordingSender::default());
    let app = App::builder(sender.clone()).build();
    app.on_message(|ctx| async move {
        let text = ctx.activity().text.clone().unwrap_or_default();
        ctx.send(MessageActivity::new(format!("Echo: {text}"))).await?;
        Ok(None)
    });
    app.on::<ActionActivity, _, _>(|ctx| async move {
        let verb = ctx.activity().value.verb().unwrap_or_default().to_owned();
        Ok(Some(AdaptiveCardActionResponse::message(format!("Done: {verb}")).into()))
    });

    let router = build_router(Arc::new(app), "/api/messages");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, sender)
}

async fn post(addr: SocketAddr, body: String) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/messages"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn message_is_echoed_and_acknowledged() {
    let (addr, sender) = start().await;
    let body = json!({
        "type": "message",
        "id": "1",
        "channelId": "msteams",
        "serviceUrl": "https://smba.example.net/amer/",
        "from": {"id": "29:alice"},
        "recipient": {"id": "28:bot"},
        "conversation": {"id": "a:personal", "conversationType": "personal"},
        "text": "hello"
    });

    let resp = post(addr, body.to_string()).await;
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().is_empty());

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].as_message().and_then(|m| m.text.as_deref()),
        Some("Echo: hello")
    );
}

#[tokio::test]
async fn invoke_body_is_returned_as_json() {
    let (addr, _) = start().await;
    let body = json!({
        "type": "invoke",
        "name": "adaptiveCard/action",
        "value": {"action": {"type": "Action.Execute", "verb": "approve"}}
    });

    let resp = post(addr, body.to_string()).await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["value"], "Done: approve");
    assert_eq!(json["type"], "application/vnd.microsoft.activity.message");
}

#[tokio::test]
async fn malformed_payload_is_a_bad_request() {
    let (addr, sender) = start().await;

    let resp = post(addr, "{not json".into()).await;
    assert_eq!(resp.status(), 400);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].is_string());

    let resp = post(addr, json!({"type": "invoke"}).to_string()).await;
    assert_eq!(resp.status(), 400);
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_routes() {
    let (addr, _) = start().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["routes"], 2);
}

#[tokio::test]
async fn get_on_messages_path_is_rejected() {
    let (addr, _) = start().await;
    let resp = reqwest::get(format!("http://{addr}/api/messages")).await.unwrap();
    assert_eq!(resp.status(), 405);
}
