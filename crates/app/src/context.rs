//! The per-turn handle given to route handlers.

use std::sync::Arc;

use {
    teamwire_activity::{
        Activity, ActivityVariant, ConversationReference, InvokeResponse, MessageActivity,
        TypingActivity,
    },
    tokio_util::sync::CancellationToken,
    tracing::Span,
};

use crate::{
    app::AppOptions,
    dispatch::Continuation,
    error::{Error, Result},
    route::RouteTable,
    sender::{Outbound, UserTokenClient},
};

/// Everything a turn shares between the contexts derived for it.
pub(crate) struct TurnState {
    pub(crate) activity: Arc<Activity>,
    pub(crate) reference: ConversationReference,
    pub(crate) outbound: Arc<Outbound>,
    pub(crate) tokens: Option<Arc<dyn UserTokenClient>>,
    pub(crate) routes: Arc<RouteTable>,
    pub(crate) cancel: CancellationToken,
    pub(crate) span: Span,
    pub(crate) options: Arc<AppOptions>,
}

/// A route handler's view of the turn.
///
/// `A` is the shape the activity has been narrowed to. Narrowing with
/// [`TurnContext::as_type`] yields a new context over the same turn: sends,
/// the conversation reference, cancellation and the route continuation are
/// all shared, only the typed view of the activity differs.
pub struct TurnContext<A = Activity> {
    activity: Arc<A>,
    turn: Arc<TurnState>,
    continuation: Arc<Continuation>,
}

impl<A> Clone for TurnContext<A> {
    fn clone(&self) -> Self {
        Self {
            activity: Arc::clone(&self.activity),
            turn: Arc::clone(&self.turn),
            continuation: Arc::clone(&self.continuation),
        }
    }
}

impl TurnContext {
    pub(crate) fn new(turn: Arc<TurnState>, continuation: Arc<Continuation>) -> Self {
        Self {
            activity: Arc::clone(&turn.activity),
            turn,
            continuation,
        }
    }
}

impl<A: Send + Sync + 'static> TurnContext<A> {
    pub fn activity(&self) -> &A {
        &self.activity
    }

    /// The activity as decoded, before any narrowing.
    pub fn root(&self) -> &Activity {
        &self.turn.activity
    }

    pub fn reference(&self) -> &ConversationReference {
        &self.turn.reference
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.turn.cancel
    }

    /// The turn's tracing span.
    pub fn span(&self) -> &Span {
        &self.turn.span
    }

    /// Narrow to a more specific shape. Fails with [`Error::InvalidCast`]
    /// when the decoded activity is not a `T`.
    pub fn as_type<T: ActivityVariant>(&self) -> Result<TurnContext<T>> {
        let root = &self.turn.activity;
        let narrowed = T::narrow(root).ok_or(Error::InvalidCast {
            from: root.type_name(),
            to: T::TYPE_NAME,
        })?;
        Ok(TurnContext {
            activity: Arc::new(narrowed.clone()),
            turn: Arc::clone(&self.turn),
            continuation: Arc::clone(&self.continuation),
        })
    }

    /// Continue with the next matching route and return its result.
    pub async fn next(&self) -> Result<Option<InvokeResponse>> {
        self.continuation.run(&self.turn).await
    }

    /// Send an activity into the turn's conversation.
    pub async fn send(&self, activity: impl Into<Activity>) -> Result<Activity> {
        self.send_to(activity.into(), &self.turn.reference, false)
            .await
    }

    /// Send an activity visible only to the turn's sender.
    pub async fn send_targeted(&self, activity: impl Into<Activity>) -> Result<Activity> {
        self.send_to(activity.into(), &self.turn.reference, true)
            .await
    }

    /// Reply to the inbound activity: text, an attachment or a full message.
    pub async fn reply(&self, message: impl Into<MessageActivity>) -> Result<Activity> {
        let mut message = message.into();
        message.base.reply_to_id = self.turn.activity.id().map(str::to_owned);
        self.send(message).await
    }

    pub async fn typing(&self) -> Result<Activity> {
        self.send(TypingActivity::new()).await
    }

    pub(crate) async fn send_to(
        &self,
        activity: Activity,
        reference: &ConversationReference,
        is_targeted: bool,
    ) -> Result<Activity> {
        self.turn
            .outbound
            .deliver(activity, reference, is_targeted, &self.turn.cancel)
            .await
    }

    pub(crate) fn turn(&self) -> &TurnState {
        &self.turn
    }
}
