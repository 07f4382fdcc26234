//! `message/submitAction`: actions taken on a sent message.
//!
//! Splits again on `value.actionName`; `feedback` (thumbs up/down on an
//! AI-labelled message) has its own shape.

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
pub struct MessageSubmitAction {
    #[serde(default)]
    pub action_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_value: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// `actionValue` of a feedback submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackValue {
    /// `like` or `dislike`.
    #[serde(default)]
    pub reaction: String,
    /// JSON-encoded `{"feedbackText": ...}` as sent by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl MessageSubmitAction {
    pub fn feedback(&self) -> Option<FeedbackValue> {
        let value = self.action_value.clone()?;
        serde_json::from_value(value).ok()
    }
}

invoke_leaf!(
    SubmitActionActivity = "message/submitAction",
    MessageSubmitAction,
    |a| Activity::Invoke(InvokeActivity::Message(MessageInvokeActivity::SubmitAction(a)))
);

invoke_leaf!(
    FeedbackActivity = "message/submitAction",
    MessageSubmitAction,
    |a| Activity::Invoke(InvokeActivity::Message(MessageInvokeActivity::Feedback(a)))
);

invoke_family!(
    MessageInvokeActivity,
    "invoke/message",
    |a| (Activity::Invoke(InvokeActivity::Message(a))),
    {
        SubmitAction(SubmitActionActivity),
        Feedback(FeedbackActivity),
    }
);
