//! `tab/*`: requests from a personal or channel tab.

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
pub struct TabEntityContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_entity_id: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_context: Option<TabEntityContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<TabContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Present on `tab/submit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

invoke_leaf!(
    FetchActivity = "tab/fetch",
    TabRequest,
    |a| Activity::Invoke(InvokeActivity::Tab(TabActivity::Fetch(a)))
);

invoke_leaf!(
    SubmitActivity = "tab/submit",
    TabRequest,
    |a| Activity::Invoke(InvokeActivity::Tab(TabActivity::Submit(a)))
);

invoke_family!(
    TabActivity,
    "invoke/tab",
    |a| (Activity::Invoke(InvokeActivity::Tab(a))),
    {
        Fetch(FetchActivity),
        Submit(SubmitActivity),
    }
);

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::ActivityVariant};

    #[test]
    fn leaves_narrow_only_to_themselves() {
        let activity = Activity::from(SubmitActivity::default());
        assert!(activity.narrow::<SubmitActivity>().is_some());
        assert!(activity.narrow::<FetchActivity>().is_none());
        assert!(activity.narrow::<TabActivity>().is_some());
        assert!(activity.narrow::<InvokeActivity>().is_some());
        assert_eq!(activity.type_name(), SubmitActivity::TYPE_NAME);
        assert_eq!(activity.invoke_name(), Some("tab/submit"));
    }

    #[test]
    fn route_names_follow_invoke_name() {
        assert_eq!(FetchActivity::ROUTE_NAME, "invoke/tab/fetch");
        assert_eq!(TabActivity::ROUTE_NAME, "invoke/tab");
    }
}
