//! `signin/*`: the invoke half of the OAuth sign-in handshake.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    activity::Activity,
    invoke::{InvokeActivity, invoke_family, invoke_leaf},
};

/// Value of `signin/tokenExchange`: a token the client obtained via SSO,
/// offered to the bot for exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Value of `signin/verifyState`: the magic code typed back by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyStateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

invoke_leaf!(
    TokenExchangeActivity = "signin/tokenExchange",
    TokenExchangeRequest,
    |a| Activity::Invoke(InvokeActivity::SignIn(SignInActivity::TokenExchange(a)))
);

invoke_leaf!(
    VerifyStateActivity = "signin/verifyState",
    VerifyStateRequest,
    |a| Activity::Invoke(InvokeActivity::SignIn(SignInActivity::VerifyState(a)))
);

invoke_family!(
    SignInActivity,
    "invoke/signin",
    |a| (Activity::Invoke(InvokeActivity::SignIn(a))),
    {
        TokenExchange(TokenExchangeActivity),
        VerifyState(VerifyStateActivity),
    }
);
