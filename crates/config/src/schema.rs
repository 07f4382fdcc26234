//! Config schema types.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::gating::{DmPolicy, GroupPolicy, MentionMode};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamwireConfig {
    pub server: ServerConfig,
    pub bot: BotConfig,
}

/// Webhook listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
    /// Path the channel posts activities to.
    pub messages_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3978,
            messages_path: "/api/messages".into(),
        }
    }
}

/// Bot registration and who may talk to the bot.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Microsoft App ID (bot registration client ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Microsoft App Password (client secret).
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub app_password: Option<Secret<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// OAuth connection used by sign-in when a handler does not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_connection_name: Option<String>,

    pub dm_policy: DmPolicy,
    pub group_policy: GroupPolicy,
    /// Mention activation mode for group chats.
    pub mention_mode: MentionMode,

    /// Sender allowlist (channel user IDs or AAD object IDs).
    pub allowlist: Vec<String>,
    /// Conversation allowlist for groups.
    pub group_allowlist: Vec<String>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("app_id", &self.app_id)
            .field(
                "app_password",
                &self.app_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("tenant_id", &self.tenant_id)
            .field("oauth_connection_name", &self.oauth_connection_name)
            .field("dm_policy", &self.dm_policy)
            .field("group_policy", &self.group_policy)
            .field("mention_mode", &self.mention_mode)
            .field("allowlist", &self.allowlist)
            .field("group_allowlist", &self.group_allowlist)
            .finish()
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
