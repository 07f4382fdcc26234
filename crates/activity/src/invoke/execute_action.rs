use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    activity::Activity,
    invoke::{InvokeActivity, invoke_leaf},
};

/// Action taken on an Office 365 connector card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorCardActionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

invoke_leaf!(
    ExecuteActionActivity = "actionableMessage/executeAction",
    ConnectorCardActionQuery,
    |a| Activity::Invoke(InvokeActivity::ExecuteAction(a))
);
