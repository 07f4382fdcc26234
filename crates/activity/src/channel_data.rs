use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// Teams-specific `channelData`. Unknown keys are kept in `properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationInfo>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub id: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_group_id: Option<String>,
    /// `standard`, `sharedChannel` or `privateChannel`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub team_type: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_in_meeting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_resource_url: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ChannelData {
    /// Whether the payload came from a team or channel rather than a chat.
    pub fn is_team_scoped(&self) -> bool {
        self.team.is_some() || self.channel.is_some()
    }
}
