//! Collaborators the turn machinery talks to but does not implement: the
//! connector that delivers activities, the user token service, and
//! observers of sent activities.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    teamwire_activity::{Account, Activity, ConversationAccount, ConversationReference},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::error::{Error, Result};

/// Parameters for opening a new conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationParameters {
    pub bot: Account,
    pub members: Vec<Account>,
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Delivers activities to the channel.
///
/// Implementations own the transport (HTTP, auth headers, retries). The
/// activity handed to [`ActivitySender::send`] is already addressed from
/// `reference`.
#[async_trait]
pub trait ActivitySender: Send + Sync {
    async fn send(
        &self,
        activity: Activity,
        reference: &ConversationReference,
        is_targeted: bool,
        cancel: &CancellationToken,
    ) -> Result<Activity>;

    async fn create_conversation(
        &self,
        reference: &ConversationReference,
        parameters: ConversationParameters,
        cancel: &CancellationToken,
    ) -> Result<ConversationAccount>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub connection_name: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResource {
    pub sign_in_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_exchange_resource: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_post_resource: Option<Value>,
}

/// The Bot Framework user token service.
#[async_trait]
pub trait UserTokenClient: Send + Sync {
    /// A cached token, or `None`. `code` redeems a magic code.
    async fn get_user_token(
        &self,
        user_id: &str,
        connection_name: &str,
        channel_id: &str,
        code: Option<&str>,
    ) -> Result<Option<TokenResponse>>;

    async fn exchange_token(
        &self,
        user_id: &str,
        connection_name: &str,
        channel_id: &str,
        token: &str,
    ) -> Result<Option<TokenResponse>>;

    /// Sign-in link for an encoded token-exchange state.
    async fn get_sign_in_resource(&self, state: &str) -> Result<SignInResource>;

    async fn sign_out(
        &self,
        user_id: &str,
        connection_name: &str,
        channel_id: &str,
    ) -> Result<()>;
}

/// Notified after every successful send.
#[async_trait]
pub trait ActivityObserver: Send + Sync {
    async fn on_activity_sent(&self, activity: &Activity, reference: &ConversationReference);
}

/// Sender plus observers: the outbound half shared by every turn and by
/// proactive sends.
#[derive(Clone)]
pub struct Outbound {
    sender: Arc<dyn ActivitySender>,
    observers: Vec<Arc<dyn ActivityObserver>>,
}

impl Outbound {
    pub fn new(sender: Arc<dyn ActivitySender>, observers: Vec<Arc<dyn ActivityObserver>>) -> Self {
        Self { sender, observers }
    }

    pub fn sender(&self) -> &Arc<dyn ActivitySender> {
        &self.sender
    }

    /// Address `activity` from `reference`, send it and notify observers.
    pub async fn deliver(
        &self,
        mut activity: Activity,
        reference: &ConversationReference,
        is_targeted: bool,
        cancel: &CancellationToken,
    ) -> Result<Activity> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        activity.base_mut().apply_reference(reference);
        debug!(
            activity_type = activity.type_name(),
            conversation_id = %reference.conversation.id,
            is_targeted,
            "sending activity"
        );
        let sent = self
            .sender
            .send(activity, reference, is_targeted, cancel)
            .await?;
        for observer in &self.observers {
            observer.on_activity_sent(&sent, reference).await;
        }
        Ok(sent)
    }
}
