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
pub struct HandoffActionValue {
    #[serde(default)]
    pub continuation: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

invoke_leaf!(
    /// `handoff/action`: a conversation handed over from another bot.
    HandoffActivity = "handoff/action",
    HandoffActionValue,
    |a| Activity::Invoke(InvokeActivity::Handoff(a))
);
