//! `config/*`: bot configuration page requests.

use serde_json::Value;

use crate::{
    activity::Activity,
    invoke::{InvokeActivity, invoke_family, invoke_leaf},
};

invoke_leaf!(
    FetchActivity = "config/fetch",
    Value,
    |a| Activity::Invoke(InvokeActivity::Config(ConfigActivity::Fetch(a)))
);

invoke_leaf!(
    SubmitActivity = "config/submit",
    Value,
    |a| Activity::Invoke(InvokeActivity::Config(ConfigActivity::Submit(a)))
);

invoke_family!(
    ConfigActivity,
    "invoke/config",
    |a| (Activity::Invoke(InvokeActivity::Config(a))),
    {
        Fetch(FetchActivity),
        Submit(SubmitActivity),
    }
);
