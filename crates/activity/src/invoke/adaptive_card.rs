//! `adaptiveCard/action`: a Universal Action (`Action.Execute`) on a card.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    activity::Activity,
    invoke::{InvokeActivity, invoke_leaf},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveCardInvokeValue {
    #[serde(default)]
    pub action: AdaptiveCardInvokeAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveCardInvokeAction {
    #[serde(rename = "type", default)]
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl AdaptiveCardInvokeValue {
    pub fn verb(&self) -> Option<&str> {
        self.action.verb.as_deref()
    }
}

invoke_leaf!(
    /// A card button press delivered as `invoke`.
    ActionActivity = "adaptiveCard/action",
    AdaptiveCardInvokeValue,
    |a| Activity::Invoke(InvokeActivity::AdaptiveCardAction(a))
);
