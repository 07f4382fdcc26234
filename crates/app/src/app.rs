//! The bot application: codec, middleware, routes and outbound delivery
//! wired together for one turn at a time.

use std::{future::Future, sync::Arc};

use {
    async_trait::async_trait,
    regex::Regex,
    serde_json::json,
    teamwire_activity::{
        Activity, ActivityCodec, ActivityVariant, ConversationReference,
        ConversationUpdateActivity, EventActivity, InvokeResponse, MessageActivity,
    },
    teamwire_config::BotConfig,
    tokio_util::sync::CancellationToken,
    tracing::{Instrument, Span, error, info, info_span, warn},
    uuid::Uuid,
};

use crate::{
    context::{TurnContext, TurnState},
    dispatch::{Router, dispatch},
    error::{Error, Result},
    pipeline::{Middleware, Pipeline, TurnHandler, TurnRequest},
    route::{Route, RouteClass, RouteTable},
    sender::{ActivityObserver, ActivitySender, Outbound, UserTokenClient},
    sign_in,
};

/// Bot identity and sign-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppOptions {
    pub app_id: Option<String>,
    /// Connection used by sign-in when a call does not name one.
    pub oauth_connection_name: Option<String>,
}

impl From<&BotConfig> for AppOptions {
    fn from(config: &BotConfig) -> Self {
        Self {
            app_id: config.app_id.clone(),
            oauth_connection_name: config.oauth_connection_name.clone(),
        }
    }
}

pub struct AppBuilder {
    sender: Arc<dyn ActivitySender>,
    observers: Vec<Arc<dyn ActivityObserver>>,
    tokens: Option<Arc<dyn UserTokenClient>>,
    pipeline: Pipeline,
    codec: ActivityCodec,
    options: AppOptions,
}

impl AppBuilder {
    /// Enables sign-in and registers the `signin/*` system routes.
    pub fn with_tokens(mut self, tokens: Arc<dyn UserTokenClient>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.pipeline.push(Arc::new(middleware));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ActivityObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_options(mut self, options: AppOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the standard codec, e.g. with one whose registry knows
    /// extra shapes.
    pub fn with_codec(mut self, codec: ActivityCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn build(self) -> App {
        let app = App {
            codec: self.codec,
            pipeline: self.pipeline,
            router: Router::new(),
            outbound: Arc::new(Outbound::new(self.sender, self.observers)),
            tokens: self.tokens,
            options: Arc::new(self.options),
        };
        if app.tokens.is_some() {
            app.route(sign_in::token_exchange_route());
            app.route(sign_in::verify_state_route());
        }
        info!(
            middleware = ?app.pipeline.names(),
            sign_in = app.tokens.is_some(),
            "app ready"
        );
        app
    }
}

pub struct App {
    codec: ActivityCodec,
    pipeline: Pipeline,
    router: Router,
    outbound: Arc<Outbound>,
    tokens: Option<Arc<dyn UserTokenClient>>,
    options: Arc<AppOptions>,
}

/// A route matching every activity of shape `T` that `predicate` accepts;
/// the handler receives the context already narrowed to `T`.
fn typed_route<T, P, H, Fut>(
    name: impl Into<String>,
    class: RouteClass,
    predicate: P,
    handler: H,
) -> Route
where
    T: ActivityVariant,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    H: Fn(TurnContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Route::new(
        name,
        class,
        move |activity: &Activity| T::narrow(activity).is_some_and(|typed| predicate(typed)),
        move |ctx: TurnContext| {
            let handler = Arc::clone(&handler);
            async move {
                let ctx = ctx.as_type::<T>()?;
                handler(ctx).await
            }
        },
    )
}

impl App {
    pub fn builder(sender: Arc<dyn ActivitySender>) -> AppBuilder {
        AppBuilder {
            sender,
            observers: Vec::new(),
            tokens: None,
            pipeline: Pipeline::new(),
            codec: ActivityCodec::default(),
            options: AppOptions::default(),
        }
    }

    pub fn codec(&self) -> &ActivityCodec {
        &self.codec
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Register a route. Safe while turns are running: they keep the table
    /// they started with.
    pub fn route(&self, route: Route) -> &Self {
        self.router.register(route);
        self
    }

    pub fn routes(&self) -> Arc<RouteTable> {
        self.router.snapshot()
    }

    /// Every activity that narrows to `T`.
    pub fn on<T, H, Fut>(&self, handler: H) -> &Self
    where
        T: ActivityVariant,
        H: Fn(TurnContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.on_when::<T, _, _, _>(|_| true, handler)
    }

    /// Activities that narrow to `T` and satisfy `predicate`.
    pub fn on_when<T, P, H, Fut>(&self, predicate: P, handler: H) -> &Self
    where
        T: ActivityVariant,
        P: Fn(&T) -> bool + Send + Sync + 'static,
        H: Fn(TurnContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.route(typed_route(T::ROUTE_NAME, RouteClass::User, predicate, handler))
    }

    pub fn on_message<H, Fut>(&self, handler: H) -> &Self
    where
        H: Fn(TurnContext<MessageActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.on::<MessageActivity, _, _>(handler)
    }

    /// Messages whose text, mentions stripped, matches `pattern`.
    pub fn on_message_text<H, Fut>(&self, pattern: Regex, handler: H) -> &Self
    where
        H: Fn(TurnContext<MessageActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        let name = format!("message/{}", pattern.as_str());
        self.route(typed_route(
            name,
            RouteClass::User,
            move |message: &MessageActivity| {
                message
                    .text_without_mentions()
                    .is_some_and(|text| pattern.is_match(&text))
            },
            handler,
        ))
    }

    pub fn on_conversation_update<H, Fut>(&self, handler: H) -> &Self
    where
        H: Fn(TurnContext<ConversationUpdateActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.on::<ConversationUpdateActivity, _, _>(handler)
    }

    pub fn on_members_added<H, Fut>(&self, handler: H) -> &Self
    where
        H: Fn(TurnContext<ConversationUpdateActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.route(typed_route(
            "conversationUpdate/membersAdded",
            RouteClass::User,
            |update: &ConversationUpdateActivity| !update.members_added.is_empty(),
            handler,
        ))
    }

    pub fn on_members_removed<H, Fut>(&self, handler: H) -> &Self
    where
        H: Fn(TurnContext<ConversationUpdateActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.route(typed_route(
            "conversationUpdate/membersRemoved",
            RouteClass::User,
            |update: &ConversationUpdateActivity| !update.members_removed.is_empty(),
            handler,
        ))
    }

    /// Conversation updates carrying `channelData.eventType == event_type`,
    /// e.g. `channelCreated` or `teamRenamed`.
    pub fn on_conversation_event<H, Fut>(&self, event_type: impl Into<String>, handler: H) -> &Self
    where
        H: Fn(TurnContext<ConversationUpdateActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        let event_type = event_type.into();
        self.route(typed_route(
            format!("conversationUpdate/{event_type}"),
            RouteClass::User,
            move |update: &ConversationUpdateActivity| {
                update.event_type() == Some(event_type.as_str())
            },
            handler,
        ))
    }

    pub fn on_event<H, Fut>(&self, name: impl Into<String>, handler: H) -> &Self
    where
        H: Fn(TurnContext<EventActivity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        let name = name.into();
        self.route(typed_route(
            format!("event/{name}"),
            RouteClass::User,
            move |event: &EventActivity| event.name.as_deref() == Some(name.as_str()),
            handler,
        ))
    }

    /// A user route over the undiscriminated activity.
    pub fn on_activity<S, H, Fut>(&self, name: impl Into<String>, selector: S, handler: H) -> &Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
        H: Fn(TurnContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.route(Route::user(name, selector, handler))
    }

    /// A route that runs ahead of every user route.
    pub fn system_route<S, H, Fut>(&self, name: impl Into<String>, selector: S, handler: H) -> &Self
    where
        S: Fn(&Activity) -> bool + Send + Sync + 'static,
        H: Fn(TurnContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<InvokeResponse>>> + Send + 'static,
    {
        self.route(Route::system(name, selector, handler))
    }

    /// Decode `body` and run it as one turn.
    pub async fn handle_bytes(
        &self,
        body: &[u8],
        cancel: CancellationToken,
    ) -> Result<Option<InvokeResponse>> {
        let activity = self.codec.decode(body)?;
        self.run(activity, cancel).await
    }

    /// Run one turn: middleware outer to inner, then route dispatch.
    pub async fn run(
        &self,
        activity: Activity,
        cancel: CancellationToken,
    ) -> Result<Option<InvokeResponse>> {
        let span = info_span!(
            "turn",
            turn_id = %Uuid::new_v4(),
            activity_type = activity.type_name(),
            activity_id = activity.id().unwrap_or_default(),
        );
        self.pipeline
            .run(TurnRequest::new(activity, cancel), self)
            .instrument(span)
            .await
    }

    /// Run one turn from raw bytes and turn the outcome into what the
    /// channel gets back.
    pub async fn process(&self, body: &[u8], cancel: CancellationToken) -> InvokeResponse {
        let activity = match self.codec.decode(body) {
            Ok(activity) => activity,
            Err(e) => {
                warn!(error = %e, "rejecting undecodable activity");
                return InvokeResponse::with_status(400).with_body(json!({"error": e.to_string()}));
            },
        };
        let activity_type = activity.type_name();
        let activity_id = activity.id().unwrap_or_default().to_owned();
        match self.run(activity, cancel).await {
            Ok(Some(response)) => response,
            Ok(None) => InvokeResponse::ok(),
            Err(Error::Cancelled) => {
                info!(activity_type, %activity_id, "turn cancelled");
                InvokeResponse::with_status(503)
            },
            Err(e) => {
                error!(activity_type, %activity_id, error = %e, "turn failed");
                InvokeResponse::with_status(500)
            },
        }
    }

    /// Send outside of any turn, e.g. a notification to a conversation
    /// captured earlier.
    pub async fn send_proactive(
        &self,
        reference: &ConversationReference,
        activity: impl Into<Activity>,
        cancel: &CancellationToken,
    ) -> Result<Activity> {
        self.outbound
            .deliver(activity.into(), reference, false, cancel)
            .await
    }
}

#[async_trait]
impl TurnHandler for App {
    async fn handle(&self, turn: TurnRequest) -> Result<Option<InvokeResponse>> {
        let state = Arc::new(TurnState {
            reference: turn.activity.conversation_reference(),
            activity: turn.activity,
            outbound: Arc::clone(&self.outbound),
            tokens: self.tokens.clone(),
            routes: self.router.snapshot(),
            cancel: turn.cancel,
            span: Span::current(),
            options: Arc::clone(&self.options),
        });
        dispatch(state, 0).await
    }
}
