//! `fileConsent/invoke`: the user accepted or declined a file upload card.

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
pub struct FileUploadInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConsentCardResponse {
    /// `accept` or `decline`.
    #[serde(default)]
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_info: Option<FileUploadInfo>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl FileConsentCardResponse {
    pub fn accepted(&self) -> bool {
        self.action == "accept"
    }
}

invoke_leaf!(
    FileConsentActivity = "fileConsent/invoke",
    FileConsentCardResponse,
    |a| Activity::Invoke(InvokeActivity::FileConsent(a))
);
