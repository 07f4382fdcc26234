//! `composeExtension/*`: message extension (search and action) requests.
//!
//! `composeExtension/submitAction` splits once more on
//! `value.botMessagePreviewAction`: `edit` and `send` decode to the preview
//! shapes, anything else stays a plain submit action.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    activity::Activity,
    invoke::{InvokeActivity, invoke_family, invoke_leaf},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingExtensionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<QueryParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_options: Option<QueryOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl MessagingExtensionQuery {
    /// Value of the named query parameter, as a string.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value.as_ref())
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingExtensionAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_message_preview_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bot_activity_preview: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBasedLinkQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

invoke_leaf!(
    QueryActivity = "composeExtension/query",
    MessagingExtensionQuery,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::Query(a)))
);

invoke_leaf!(
    QuerySettingUrlActivity = "composeExtension/querySettingUrl",
    MessagingExtensionQuery,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::QuerySettingUrl(a)))
);

invoke_leaf!(
    SettingActivity = "composeExtension/setting",
    MessagingExtensionQuery,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::Setting(a)))
);

invoke_leaf!(
    SelectItemActivity = "composeExtension/selectItem",
    Value,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::SelectItem(a)))
);

invoke_leaf!(
    SubmitActionActivity = "composeExtension/submitAction",
    MessagingExtensionAction,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::SubmitAction(a)))
);

invoke_leaf!(
    /// `submitAction` with `botMessagePreviewAction: "edit"`.
    BotMessagePreviewEditActivity = "composeExtension/submitAction",
    MessagingExtensionAction,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::BotMessagePreviewEdit(a)))
);

invoke_leaf!(
    /// `submitAction` with `botMessagePreviewAction: "send"`.
    BotMessagePreviewSendActivity = "composeExtension/submitAction",
    MessagingExtensionAction,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::BotMessagePreviewSend(a)))
);

invoke_leaf!(
    FetchTaskActivity = "composeExtension/fetchTask",
    MessagingExtensionAction,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::FetchTask(a)))
);

invoke_leaf!(
    QueryLinkActivity = "composeExtension/queryLink",
    AppBasedLinkQuery,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::QueryLink(a)))
);

invoke_leaf!(
    AnonymousQueryLinkActivity = "composeExtension/anonymousQueryLink",
    AppBasedLinkQuery,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::AnonymousQueryLink(a)))
);

invoke_leaf!(
    CardButtonClickedActivity = "composeExtension/onCardButtonClicked",
    Value,
    |a| Activity::Invoke(InvokeActivity::MessageExtension(MessageExtensionActivity::CardButtonClicked(a)))
);

invoke_family!(
    MessageExtensionActivity,
    "invoke/composeExtension",
    |a| (Activity::Invoke(InvokeActivity::MessageExtension(a))),
    {
        Query(QueryActivity),
        QuerySettingUrl(QuerySettingUrlActivity),
        Setting(SettingActivity),
        SelectItem(SelectItemActivity),
        SubmitAction(SubmitActionActivity),
        BotMessagePreviewEdit(BotMessagePreviewEditActivity),
        BotMessagePreviewSend(BotMessagePreviewSendActivity),
        FetchTask(FetchTaskActivity),
        QueryLink(QueryLinkActivity),
        AnonymousQueryLink(AnonymousQueryLinkActivity),
        CardButtonClicked(CardButtonClickedActivity),
    }
);
