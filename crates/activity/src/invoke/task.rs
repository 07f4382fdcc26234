//! `task/*`: task module (dialog) requests.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    activity::Activity,
    invoke::{InvokeActivity, invoke_family, invoke_leaf, tab::TabContext},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskModuleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<TabContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_context: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

invoke_leaf!(
    FetchActivity = "task/fetch",
    TaskModuleRequest,
    |a| Activity::Invoke(InvokeActivity::Task(TaskActivity::Fetch(a)))
);

invoke_leaf!(
    SubmitActivity = "task/submit",
    TaskModuleRequest,
    |a| Activity::Invoke(InvokeActivity::Task(TaskActivity::Submit(a)))
);

invoke_family!(
    TaskActivity,
    "invoke/task",
    |a| (Activity::Invoke(InvokeActivity::Task(a))),
    {
        Fetch(FetchActivity),
        Submit(SubmitActivity),
    }
);
