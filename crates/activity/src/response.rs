//! Synchronous results returned to the channel for invoke activities.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    tracing::error,
};

/// What the HTTP layer writes back for a turn: a status and an optional
/// JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InvokeResponse {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self { status, body: None }
    }

    /// 200 with `body` serialized as JSON. A body that cannot be serialized
    /// is logged and becomes a bare 500.
    pub fn json<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status: 200,
                body: Some(body),
            },
            Err(e) => {
                error!(error = %e, "invoke response body is not serializable");
                Self::with_status(500)
            },
        }
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl Default for InvokeResponse {
    fn default() -> Self {
        Self::ok()
    }
}

/// Body of an `adaptiveCard/action` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveCardActionResponse {
    pub status_code: u16,
    #[serde(rename = "type")]
    pub response_type: String,
    pub value: Value,
}

impl AdaptiveCardActionResponse {
    pub const CARD: &'static str = "application/vnd.microsoft.card.adaptive";
    pub const ERROR: &'static str = "application/vnd.microsoft.error";
    pub const MESSAGE: &'static str = "application/vnd.microsoft.activity.message";

    /// Show `text` to the user in place of the card.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            response_type: Self::MESSAGE.to_string(),
            value: Value::String(text.into()),
        }
    }

    /// Replace the card with `card`.
    pub fn card(card: Value) -> Self {
        Self {
            status_code: 200,
            response_type: Self::CARD.to_string(),
            value: card,
        }
    }

    pub fn error(status_code: u16, code: &str, message: &str) -> Self {
        Self {
            status_code,
            response_type: Self::ERROR.to_string(),
            value: json!({"code": code, "message": message}),
        }
    }
}

impl From<AdaptiveCardActionResponse> for InvokeResponse {
    fn from(response: AdaptiveCardActionResponse) -> Self {
        InvokeResponse::json(&response)
    }
}

/// Body of a `task/fetch` or `task/submit` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskModuleResponse {
    pub task: TaskModuleAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum TaskModuleAction {
    /// Close the dialog and show a message.
    Message(String),
    /// Open (or continue) a dialog.
    Continue(TaskInfo),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Value>,
}

impl TaskModuleResponse {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            task: TaskModuleAction::Message(text.into()),
        }
    }

    pub fn continue_with(info: TaskInfo) -> Self {
        Self {
            task: TaskModuleAction::Continue(info),
        }
    }
}

impl From<TaskModuleResponse> for InvokeResponse {
    fn from(response: TaskModuleResponse) -> Self {
        InvokeResponse::json(&response)
    }
}

/// Body of a `signin/tokenExchange` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeInvokeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
}
