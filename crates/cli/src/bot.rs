//! The bot the `serve` command runs: an echo handler and a greeting, with
//! outbound activities written to the log instead of a connector.

use std::sync::Arc;

use {
    async_trait::async_trait,
    teamwire_activity::{Activity, ConversationAccount, ConversationReference, MessageActivity},
    teamwire_app::{
        AccessPolicy, AccessPolicyMiddleware, ActivitySender, App, AppOptions,
        ConversationParameters, LoggingMiddleware, Result,
    },
    teamwire_config::TeamwireConfig,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

/// Stands in for the channel connector: every outbound activity is logged
/// and reported as delivered.
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl ActivitySender for LogSender {
    async fn send(
        &self,
        activity: Activity,
        reference: &ConversationReference,
        is_targeted: bool,
        _cancel: &CancellationToken,
    ) -> Result<Activity> {
        info!(
            activity_type = activity.type_name(),
            conversation = %reference.conversation.id,
            targeted = is_targeted,
            text = activity.as_message().and_then(|m| m.text.as_deref()).unwrap_or(""),
            "outbound activity"
        );
        Ok(activity)
    }

    async fn create_conversation(
        &self,
        reference: &ConversationReference,
        parameters: ConversationParameters,
        _cancel: &CancellationToken,
    ) -> Result<ConversationAccount> {
        let member = parameters
            .members
            .first()
            .map(|m| m.id.as_str())
            .unwrap_or("unknown");
        info!(%member, service_url = %reference.service_url, "create conversation");
        let mut conversation = ConversationAccount::new(format!("a:{member}"));
        conversation.conversation_type = Some("personal".into());
        conversation.tenant_id = parameters.tenant_id;
        Ok(conversation)
    }
}

pub fn build(config: &TeamwireConfig) -> App {
    let app = App::builder(Arc::new(LogSender))
        .with_options(AppOptions::from(&config.bot))
        .with_middleware(LoggingMiddleware)
        .with_middleware(AccessPolicyMiddleware::new(AccessPolicy::from(&config.bot)))
        .build();

    app.on_members_added(|ctx| async move {
        for member in ctx.activity().members_added_excluding_recipient() {
            let name = member.name.as_deref().unwrap_or("there");
            ctx.send(MessageActivity::new(format!("Hello, {name}!"))).await?;
        }
        Ok(None)
    });

    app.on_message(|ctx| async move {
        let text = ctx.activity().text_without_mentions().unwrap_or_default();
        ctx.reply(format!("Echo: {text}")).await?;
        Ok(None)
    });

    app
}
