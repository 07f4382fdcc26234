//! Stock middleware.

use std::time::{Duration, Instant};

use {
    async_trait::async_trait,
    teamwire_activity::{Activity, InvokeResponse},
    teamwire_config::{
        BotConfig,
        gating::{DmPolicy, GroupPolicy, MentionMode, is_allowed},
    },
    tracing::{debug, info, warn},
};

use crate::{
    error::Result,
    pipeline::{Middleware, Next, TurnRequest},
};

/// Logs every inbound activity and how long its turn took.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_turn(&self, turn: TurnRequest, next: Next<'_>) -> Result<Option<InvokeResponse>> {
        let started = Instant::now();
        let activity_type = turn.activity.type_name();
        info!(
            activity_type,
            activity_id = turn.activity.id().unwrap_or_default(),
            conversation_id = turn.activity.base().conversation_id().unwrap_or_default(),
            "inbound activity"
        );
        let result = next.run(turn).await;
        let elapsed_ms = millis(started.elapsed());
        match &result {
            Ok(response) => debug!(
                activity_type,
                elapsed_ms,
                status = response.as_ref().map(|r| r.status),
                "turn complete"
            ),
            Err(e) => warn!(activity_type, elapsed_ms, error = %e, "turn failed"),
        }
        result
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Who may talk to the bot, in DMs and in group conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub dm_policy: DmPolicy,
    pub group_policy: GroupPolicy,
    pub mention_mode: MentionMode,
    pub allowlist: Vec<String>,
    pub group_allowlist: Vec<String>,
}

impl From<&BotConfig> for AccessPolicy {
    fn from(config: &BotConfig) -> Self {
        Self {
            dm_policy: config.dm_policy.clone(),
            group_policy: config.group_policy.clone(),
            mention_mode: config.mention_mode.clone(),
            allowlist: config.allowlist.clone(),
            group_allowlist: config.group_allowlist.clone(),
        }
    }
}

impl AccessPolicy {
    /// Whether a message may proceed. Non-message activities always may.
    pub fn admits(&self, activity: &Activity) -> bool {
        let Some(message) = activity.as_message() else {
            return true;
        };
        let base = &message.base;
        let is_group = base.is_group_chat();

        let policy_allowed = if is_group {
            let chat_id = base.conversation_id().unwrap_or_default();
            match self.group_policy {
                GroupPolicy::Open => true,
                GroupPolicy::Allowlist => is_allowed(chat_id, &self.group_allowlist),
                GroupPolicy::Disabled => false,
            }
        } else {
            match self.dm_policy {
                DmPolicy::Open => true,
                DmPolicy::Allowlist => base.from.as_ref().is_some_and(|from| {
                    is_allowed(&from.id, &self.allowlist)
                        || from
                            .aad_object_id
                            .as_deref()
                            .is_some_and(|aad| is_allowed(aad, &self.allowlist))
                }),
                DmPolicy::Disabled => false,
            }
        };
        let mention_allowed = if is_group {
            match self.mention_mode {
                MentionMode::Always => true,
                MentionMode::Mention => message.is_recipient_mentioned(),
                MentionMode::None => false,
            }
        } else {
            true
        };
        policy_allowed && mention_allowed
    }
}

/// Drops messages the [`AccessPolicy`] does not admit. The turn ends with
/// no response and no route runs.
#[derive(Debug, Clone)]
pub struct AccessPolicyMiddleware {
    policy: AccessPolicy,
}

impl AccessPolicyMiddleware {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Middleware for AccessPolicyMiddleware {
    fn name(&self) -> &str {
        "access-policy"
    }

    async fn on_turn(&self, turn: TurnRequest, next: Next<'_>) -> Result<Option<InvokeResponse>> {
        if !self.policy.admits(&turn.activity) {
            let base = turn.activity.base();
            info!(
                sender_id = base.from.as_ref().map(|f| f.id.as_str()).unwrap_or_default(),
                conversation_id = base.conversation_id().unwrap_or_default(),
                "access denied by policy"
            );
            return Ok(None);
        }
        next.run(turn).await
    }
}
