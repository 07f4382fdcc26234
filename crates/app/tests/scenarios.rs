#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end turns through `App` with recording collaborators.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    futures::{FutureExt, future::BoxFuture},
    regex::Regex,
    serde_json::json,
    teamwire_activity::{
        Activity, AdaptiveCardActionResponse, ConversationAccount, ConversationReference,
        GenericInvokeActivity, InvokeResponse, OAUTH_CARD_CONTENT_TYPE,
        invoke::{adaptive_card::ActionActivity, tab},
    },
    teamwire_app::{
        AccessPolicy, AccessPolicyMiddleware, ActivityObserver, ActivitySender, App, AppOptions,
        ConversationParameters, Error, Result, SignInOptions, SignInOutcome, SignInResource,
        TokenResponse, TurnContext, UserTokenClient,
    },
    tokio_util::sync::CancellationToken,
};

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingSender {
    events: Mutex<Vec<String>>,
    sent: Mutex<Vec<(Activity, ConversationReference, bool)>>,
    created: Mutex<Vec<ConversationParameters>>,
}

#[async_trait]
impl ActivitySender for RecordingSender {
    async fn send(
        &self,
        activity: Activity,
        reference: &ConversationReference,
        is_targeted: bool,
        _cancel: &CancellationToken,
    ) -> Result<Activity> {
        self.events
            .lock()
            .unwrap()
            .push(format!("send:{}", reference.conversation.id));
        self.sent
            .lock()
            .unwrap()
            .push((activity.clone(), reference.clone(), is_targeted));
        Ok(activity)
    }

    async fn create_conversation(
        &self,
        _reference: &ConversationReference,
        parameters: ConversationParameters,
        _cancel: &CancellationToken,
    ) -> Result<ConversationAccount> {
        self.events.lock().unwrap().push("create".into());
        self.created.lock().unwrap().push(parameters);
        let mut conversation = ConversationAccount::new("a:direct");
        conversation.conversation_type = Some("personal".into());
        Ok(conversation)
    }
}

#[derive(Default)]
struct FakeTokens {
    cached: Option<TokenResponse>,
    exchange_succeeds: bool,
    states: Mutex<Vec<String>>,
}

fn token(connection_name: &str) -> TokenResponse {
    TokenResponse {
        connection_name: connection_name.into(),
        token: "secret-token".into(),
        ..TokenResponse::default()
    }
}

#[async_trait]
impl UserTokenClient for FakeTokens {
    async fn get_user_token(
        &self,
        _user_id: &str,
        connection_name: &str,
        _channel_id: &str,
        code: Option<&str>,
    ) -> Result<Option<TokenResponse>> {
        if code == Some("123456") {
            return Ok(Some(token(connection_name)));
        }
        Ok(self.cached.clone())
    }

    async fn exchange_token(
        &self,
        _user_id: &str,
        connection_name: &str,
        _channel_id: &str,
        _token: &str,
    ) -> Result<Option<TokenResponse>> {
        Ok(self.exchange_succeeds.then(|| token(connection_name)))
    }

    async fn get_sign_in_resource(&self, state: &str) -> Result<SignInResource> {
        self.states.lock().unwrap().push(state.to_owned());
        Ok(SignInResource {
            sign_in_link: "https://token.example/sign-in".into(),
            ..SignInResource::default()
        })
    }

    async fn sign_out(&self, _user_id: &str, _connection_name: &str, _channel_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingObserver {
    seen: AtomicUsize,
}

#[async_trait]
impl ActivityObserver for CountingObserver {
    async fn on_activity_sent(&self, _activity: &Activity, _reference: &ConversationReference) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

type StepFn =
    Box<dyn Fn(TurnContext) -> BoxFuture<'static, Result<Option<InvokeResponse>>> + Send + Sync>;

async fn run_step(
    ctx: TurnContext,
    label: &'static str,
    log: Log,
    continues: bool,
    own: Option<u16>,
) -> Result<Option<InvokeResponse>> {
    log.lock().unwrap().push(label.to_string());
    if continues {
        let next = ctx.next().await?;
        log.lock()
            .unwrap()
            .push(format!("{label}<-{:?}", next.map(|r| r.status)));
    }
    Ok(own.map(InvokeResponse::with_status))
}

/// A handler that records `label`, optionally continues, then returns `own`.
fn step(label: &'static str, log: &Log, continues: bool, own: Option<u16>) -> StepFn {
    let log = Arc::clone(log);
    Box::new(move |ctx: TurnContext| {
        run_step(ctx, label, Arc::clone(&log), continues, own).boxed()
    })
}

fn app() -> (App, Arc<RecordingSender>) {
    let sender = Arc::new(RecordingSender::default());
    (App::builder(sender.clone()).build(), sender)
}

fn personal_message(text: &str) -> Vec<u8> {
    json!({
        "type": "message",
        "id": "1700000000001",
        "channelId": "msteams",
        "serviceUrl": "https://smba.example.net/amer/",
        "from": {"id": "29:alice", "name": "Alice"},
        "recipient": {"id": "28:bot", "name": "Helper"},
        "conversation": {"id": "a:personal", "conversationType": "personal", "tenantId": "t1"},
        "text": text
    })
    .to_string()
    .into_bytes()
}

fn group_message(text: &str) -> Vec<u8> {
    json!({
        "type": "message",
        "id": "1700000000002",
        "channelId": "msteams",
        "serviceUrl": "https://smba.example.net/amer/",
        "from": {"id": "29:alice", "name": "Alice"},
        "recipient": {"id": "28:bot", "name": "Helper"},
        "conversation": {"id": "19:group@thread.v2", "conversationType": "groupChat", "tenantId": "t1", "isGroup": true},
        "text": text
    })
    .to_string()
    .into_bytes()
}

fn log_of(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn system_routes_run_before_user_routes() {
    let (app, _) = app();
    let log = Log::default();
    app.on_activity("user/b", |_| true, step("B", &log, true, None));
    app.system_route("system/a", |_| true, step("A", &log, true, None));
    app.on_activity("user/c", |_| true, step("C", &log, true, None));

    assert_eq!(app.routes().names(), vec!["system/a", "user/b", "user/c"]);
    let response = app.process(&personal_message("hi"), CancellationToken::new()).await;
    assert_eq!(response, InvokeResponse::ok());
    assert_eq!(log_of(&log), vec!["A", "B", "C", "C<-None", "B<-None", "A<-None"]);
}

#[tokio::test]
async fn next_returns_later_route_value() {
    let (app, _) = app();
    let log = Log::default();
    app.on_activity("first", |_| true, step("first", &log, true, None));
    app.on_activity("second", |_| true, step("second", &log, false, Some(202)));

    let result = app
        .handle_bytes(&personal_message("hi"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.map(|r| r.status), Some(202));
    assert_eq!(log_of(&log), vec!["first", "second", "first<-Some(202)"]);
}

#[tokio::test]
async fn own_value_without_next_skips_later_routes() {
    let (app, _) = app();
    let log = Log::default();
    app.on_activity("first", |_| true, step("first", &log, false, Some(201)));
    app.on_activity("second", |_| true, step("second", &log, false, Some(202)));

    let result = app
        .handle_bytes(&personal_message("hi"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.map(|r| r.status), Some(201));
    assert_eq!(log_of(&log), vec!["first"]);
}

/// Property to confirm against multi-route integrations: a handler that
/// continues and then returns its own value overrides the later route.
#[tokio::test]
async fn own_value_after_next_overrides_later_value() {
    let (app, _) = app();
    let log = Log::default();
    app.on_activity("first", |_| true, step("first", &log, true, Some(201)));
    app.on_activity("second", |_| true, step("second", &log, false, Some(202)));

    let result = app
        .handle_bytes(&personal_message("hi"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.map(|r| r.status), Some(201));
    assert_eq!(log_of(&log), vec!["first", "second", "first<-Some(202)"]);
}

#[tokio::test]
async fn second_next_does_not_rerun_routes() {
    let (app, _) = app();
    let runs = Arc::new(AtomicUsize::new(0));
    app.on_activity("first", |_| true, |ctx: TurnContext| async move {
        let once = ctx.next().await?;
        let twice = ctx.next().await?;
        assert_eq!(once, twice);
        Ok(None)
    });
    let counter = Arc::clone(&runs);
    app.on_activity("second", |_| true, move |_ctx: TurnContext| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(InvokeResponse::with_status(202)))
        }
    });

    let result = app
        .handle_bytes(&personal_message("hi"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.map(|r| r.status), Some(202));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn narrowing_to_the_wrong_leaf_fails() {
    let (app, _) = app();
    app.on_activity("any", |_| true, |ctx: TurnContext| async move {
        ctx.as_type::<tab::FetchActivity>()?;
        Ok(None)
    });

    let body = br#"{"type":"invoke","name":"tab/submit","value":{"data":{"k":1}}}"#;
    let err = app
        .handle_bytes(body, CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        Error::InvalidCast { from, to } => {
            assert_eq!(from, "SubmitActivity");
            assert_eq!(to, "FetchActivity");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(app.process(body, CancellationToken::new()).await.status, 500);
}

#[tokio::test]
async fn message_with_only_a_system_route_is_empty_ok() {
    let (app, _) = app();
    let log = Log::default();
    app.system_route("system/log", |_| true, step("log", &log, false, None));

    let body = br#"{"kind":"message","text":"hi"}"#;
    let result = app.handle_bytes(body, CancellationToken::new()).await.unwrap();
    assert_eq!(result, None);

    let response = app.process(body, CancellationToken::new()).await;
    assert_eq!(response.status, 200);
    assert!(response.body.is_none());
    assert_eq!(log_of(&log), vec!["log", "log"]);
}

#[tokio::test]
async fn card_action_returns_its_message() {
    let (app, _) = app();
    app.on::<ActionActivity, _, _>(|ctx| async move {
        let verb = ctx.activity().value.verb().unwrap_or_default().to_owned();
        Ok(Some(AdaptiveCardActionResponse::message(format!("Done: {verb}")).into()))
    });

    let body = json!({
        "type": "invoke",
        "name": "adaptiveCard/action",
        "value": {"action": {"type": "Action.Execute", "verb": "approve", "data": {"id": 7}}}
    })
    .to_string();
    let response = app.process(body.as_bytes(), CancellationToken::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body.unwrap(),
        json!({
            "statusCode": 200,
            "type": "application/vnd.microsoft.activity.message",
            "value": "Done: approve"
        })
    );
}

#[tokio::test]
async fn invoke_without_name_is_a_bad_request() {
    let (app, _) = app();
    let response = app
        .process(br#"{"type":"invoke"}"#, CancellationToken::new())
        .await;
    assert_eq!(response.status, 400);
    let error = response.body.unwrap()["error"].as_str().unwrap().to_owned();
    assert!(error.contains("name"), "{error}");
}

#[tokio::test]
async fn unknown_invoke_name_reaches_generic_routes() {
    let (app, _) = app();
    app.on::<GenericInvokeActivity, _, _>(|ctx| async move {
        Ok(Some(InvokeResponse::ok().with_body(json!({"name": ctx.activity().name}))))
    });

    let response = app
        .process(
            br#"{"type":"invoke","name":"unmapped/thing"}"#,
            CancellationToken::new(),
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body.unwrap(), json!({"name": "unmapped/thing"}));
}

#[tokio::test]
async fn cancellation_stops_the_chain() {
    let (app, sender) = app();
    let log = Log::default();
    app.on_activity("first", |_| true, |ctx: TurnContext| async move {
        ctx.cancellation().cancel();
        ctx.next().await
    });
    app.on_activity("second", |_| true, step("second", &log, false, Some(202)));

    let response = app.process(&personal_message("hi"), CancellationToken::new()).await;
    assert_eq!(response.status, 503);
    assert!(log_of(&log).is_empty());
    assert!(sender.sent.lock().unwrap().is_empty());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = app
        .handle_bytes(&personal_message("hi"), cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn reply_is_addressed_and_observed() {
    let sender = Arc::new(RecordingSender::default());
    let observer = Arc::new(CountingObserver::default());
    let app = App::builder(sender.clone())
        .with_observer(observer.clone())
        .build();
    app.on_message_text(Regex::new("^hi$").unwrap(), |ctx| async move {
        let text = ctx.activity().text.clone().unwrap_or_default();
        ctx.reply(format!("Echo: {text}")).await?;
        Ok(None)
    });

    app.process(&personal_message("hi"), CancellationToken::new()).await;
    app.process(&personal_message("bye"), CancellationToken::new()).await;

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (activity, reference, is_targeted) = &sent[0];
    assert!(!is_targeted);
    assert_eq!(reference.conversation.id, "a:personal");
    let message = activity.as_message().unwrap();
    assert_eq!(message.text.as_deref(), Some("Echo: hi"));
    assert_eq!(message.base.reply_to_id.as_deref(), Some("1700000000001"));
    assert_eq!(message.base.from.as_ref().unwrap().id, "28:bot");
    assert_eq!(message.base.recipient.as_ref().unwrap().id, "29:alice");
    assert_eq!(observer.seen.load(Ordering::SeqCst), 1);
}

/// A connector that refuses every delivery.
struct UnreachableSender;

#[async_trait]
impl ActivitySender for UnreachableSender {
    async fn send(
        &self,
        _activity: Activity,
        _reference: &ConversationReference,
        _is_targeted: bool,
        _cancel: &CancellationToken,
    ) -> Result<Activity> {
        Err(Error::send_failure(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connector unreachable",
        )))
    }

    async fn create_conversation(
        &self,
        _reference: &ConversationReference,
        _parameters: ConversationParameters,
        _cancel: &CancellationToken,
    ) -> Result<ConversationAccount> {
        Err(Error::unavailable("connector unreachable"))
    }
}

fn unreachable_app() -> (App, Arc<CountingObserver>) {
    let observer = Arc::new(CountingObserver::default());
    let app = App::builder(Arc::new(UnreachableSender))
        .with_observer(observer.clone())
        .build();
    (app, observer)
}

#[tokio::test]
async fn send_failure_aborts_the_chain() {
    let (app, observer) = unreachable_app();
    let log = Log::default();
    let first_log = Arc::clone(&log);
    app.on_activity("first", |_| true, move |ctx: TurnContext| {
        let log = Arc::clone(&first_log);
        async move {
            log.lock().unwrap().push("first".into());
            ctx.reply("working on it").await?;
            log.lock().unwrap().push("first after reply".into());
            ctx.next().await
        }
    });
    app.on_activity("second", |_| true, step("second", &log, false, Some(202)));

    let err = app
        .handle_bytes(&personal_message("hi"), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SendFailure { .. }), "{err}");
    assert!(err.to_string().contains("connector unreachable"));
    assert_eq!(log_of(&log), vec!["first"]);
    assert_eq!(observer.seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn send_failure_in_later_route_surfaces_through_next() {
    let (app, observer) = unreachable_app();
    let log = Log::default();
    app.on_activity("first", |_| true, step("first", &log, true, Some(201)));
    app.on_message(|ctx| async move {
        ctx.send(ctx.activity().clone()).await?;
        Ok(None)
    });

    let response = app.process(&personal_message("hi"), CancellationToken::new()).await;
    assert_eq!(response.status, 500);
    assert!(response.body.is_none());
    assert_eq!(log_of(&log), vec!["first"]);
    assert_eq!(observer.seen.load(Ordering::SeqCst), 0);
}

fn sign_in_app(tokens: FakeTokens) -> (App, Arc<RecordingSender>, Arc<FakeTokens>) {
    let sender = Arc::new(RecordingSender::default());
    let tokens = Arc::new(tokens);
    let app = App::builder(sender.clone())
        .with_tokens(tokens.clone())
        .with_options(AppOptions {
            app_id: Some("app-1".into()),
            oauth_connection_name: Some("graph".into()),
        })
        .build();
    app.on_message(|ctx| async move {
        match ctx.sign_in(SignInOptions::default()).await? {
            SignInOutcome::Token(token) => {
                ctx.reply(format!("signed in to {}", token.connection_name))
                    .await?;
            },
            SignInOutcome::Pending(_) => {},
        }
        Ok(None)
    });
    (app, sender, tokens)
}

#[tokio::test]
async fn group_sign_in_opens_a_direct_conversation_first() {
    let (app, sender, tokens) = sign_in_app(FakeTokens::default());

    let response = app.process(&group_message("login"), CancellationToken::new()).await;
    assert_eq!(response.status, 200);

    assert_eq!(*sender.events.lock().unwrap(), vec!["create", "send:a:direct"]);
    let created = sender.created.lock().unwrap();
    assert_eq!(created[0].members[0].id, "29:alice");
    assert!(!created[0].is_group);
    assert_eq!(created[0].tenant_id.as_deref(), Some("t1"));

    let sent = sender.sent.lock().unwrap();
    let (activity, reference, _) = &sent[0];
    assert_eq!(reference.conversation.id, "a:direct");
    let card = activity.as_message().unwrap();
    assert_eq!(card.base.recipient.as_ref().unwrap().id, "29:alice");
    assert_eq!(card.base.conversation_id(), Some("a:direct"));
    assert_eq!(card.base.attachments[0].content_type, OAUTH_CARD_CONTENT_TYPE);
    let content = card.base.attachments[0].content.as_ref().unwrap();
    assert_eq!(content["connectionName"], "graph");
    assert_eq!(content["buttons"][0]["value"], "https://token.example/sign-in");

    let state = teamwire_app::TokenExchangeState::decode(&tokens.states.lock().unwrap()[0]).unwrap();
    assert_eq!(state.conversation.conversation.id, "a:direct");
    assert_eq!(
        state.relates_to.unwrap().conversation.id,
        "19:group@thread.v2"
    );
    assert_eq!(state.ms_app_id.as_deref(), Some("app-1"));
}

#[tokio::test]
async fn cached_token_skips_the_card() {
    let (app, sender, _) = sign_in_app(FakeTokens {
        cached: Some(token("graph")),
        ..FakeTokens::default()
    });

    app.process(&personal_message("login"), CancellationToken::new()).await;

    assert!(sender.created.lock().unwrap().is_empty());
    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].0.as_message().unwrap().text.as_deref(),
        Some("signed in to graph")
    );
}

fn token_exchange_body() -> Vec<u8> {
    json!({
        "type": "invoke",
        "name": "signin/tokenExchange",
        "channelId": "msteams",
        "from": {"id": "29:alice"},
        "recipient": {"id": "28:bot"},
        "conversation": {"id": "a:personal"},
        "value": {"id": "exchange-1", "connectionName": "graph", "token": "sso-token"}
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn token_exchange_success_is_acknowledged() {
    let (app, _, _) = sign_in_app(FakeTokens {
        exchange_succeeds: true,
        ..FakeTokens::default()
    });

    let response = app.process(&token_exchange_body(), CancellationToken::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body.unwrap(),
        json!({"id": "exchange-1", "connectionName": "graph"})
    );
}

#[tokio::test]
async fn token_exchange_failure_is_a_precondition_failure() {
    let (app, _, _) = sign_in_app(FakeTokens::default());

    let response = app.process(&token_exchange_body(), CancellationToken::new()).await;
    assert_eq!(response.status, 412);
    let body = response.body.unwrap();
    assert_eq!(body["id"], "exchange-1");
    assert!(body["failureDetail"].as_str().is_some());
}

#[tokio::test]
async fn verify_state_redeems_the_magic_code() {
    let (app, _, _) = sign_in_app(FakeTokens::default());
    let body = |code: &str| {
        json!({
            "type": "invoke",
            "name": "signin/verifyState",
            "channelId": "msteams",
            "from": {"id": "29:alice"},
            "value": {"state": code}
        })
        .to_string()
        .into_bytes()
    };

    let accepted = app.process(&body("123456"), CancellationToken::new()).await;
    assert_eq!(accepted.status, 200);
    let rejected = app.process(&body("000000"), CancellationToken::new()).await;
    assert_eq!(rejected.status, 412);
}

#[tokio::test]
async fn access_policy_drops_unmentioned_group_messages() {
    let sender = Arc::new(RecordingSender::default());
    let app = App::builder(sender.clone())
        .with_middleware(AccessPolicyMiddleware::new(AccessPolicy::default()))
        .build();
    let log = Log::default();
    app.on_activity("all", |_| true, step("all", &log, false, None));

    let response = app.process(&group_message("hello"), CancellationToken::new()).await;
    assert_eq!(response, InvokeResponse::ok());
    assert!(log_of(&log).is_empty());

    app.process(&personal_message("hello"), CancellationToken::new()).await;
    assert_eq!(log_of(&log), vec!["all"]);
}
