//! OAuth sign-in: the OAuth card flow started from a turn, and the system
//! routes answering the `signin/*` invokes that complete it.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    serde::{Deserialize, Serialize},
    serde_json::Value,
    teamwire_activity::{
        Account, Activity, ActivityVariant, Attachment, ConversationReference, InvokeResponse,
        MessageActivity, OAUTH_CARD_CONTENT_TYPE, TokenExchangeInvokeResponse,
        invoke::sign_in::{TokenExchangeActivity, VerifyStateActivity},
    },
    tracing::{debug, info, warn},
};

use crate::{
    context::TurnContext,
    error::{Error, Result},
    route::Route,
    sender::{ConversationParameters, TokenResponse, UserTokenClient},
};

const EXCHANGE_FAILED: &str =
    "The bot is unable to exchange token. Proceed with regular login.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOptions {
    /// Falls back to the app's configured connection.
    pub connection_name: Option<String>,
    pub title: String,
    pub text: String,
}

impl Default for SignInOptions {
    fn default() -> Self {
        Self {
            connection_name: None,
            title: "Sign in".into(),
            text: "Please sign in to continue.".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    /// The user already had a token.
    Token(TokenResponse),
    /// An OAuth card was sent; the flow completes through a `signin/*` invoke.
    Pending(Activity),
}

/// State handed to the token service when requesting a sign-in link, and
/// echoed back to the bot once the user signs in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeState {
    pub connection_name: String,
    pub conversation: ConversationReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<ConversationReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms_app_id: Option<String>,
}

impl TokenExchangeState {
    /// Base64 over the JSON form.
    pub fn encode(&self) -> Result<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::external("invalid token exchange state", e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OAuthCard<'a> {
    text: &'a str,
    connection_name: &'a str,
    buttons: [CardAction<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    token_exchange_resource: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_post_resource: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
struct CardAction<'a> {
    #[serde(rename = "type")]
    action_type: &'static str,
    title: &'a str,
    value: &'a str,
}

fn user_of(activity: &Activity) -> Result<&Account> {
    activity
        .base()
        .from
        .as_ref()
        .ok_or_else(|| Error::handler("activity has no sender"))
}

impl<A: Send + Sync + 'static> TurnContext<A> {
    fn token_client(&self) -> Result<&dyn UserTokenClient> {
        self.turn()
            .tokens
            .as_deref()
            .ok_or_else(|| Error::unavailable("no user token client configured"))
    }

    fn connection_name(&self, requested: Option<&str>) -> Result<String> {
        requested
            .or(self.turn().options.oauth_connection_name.as_deref())
            .map(str::to_owned)
            .ok_or_else(|| Error::unavailable("no OAuth connection configured"))
    }

    /// Return the user's token if the token service already has one;
    /// otherwise send an OAuth card.
    ///
    /// In group conversations the card goes to a new 1:1 conversation with
    /// the sender so the sign-in link is not shown to everyone.
    pub async fn sign_in(&self, options: SignInOptions) -> Result<SignInOutcome> {
        let tokens = self.token_client()?;
        let connection_name = self.connection_name(options.connection_name.as_deref())?;
        let user = user_of(self.root())?.clone();
        let reference = self.reference();

        if let Some(token) = tokens
            .get_user_token(&user.id, &connection_name, &reference.channel_id, None)
            .await?
        {
            debug!(connection = %connection_name, "user already signed in");
            return Ok(SignInOutcome::Token(token));
        }

        let (target, relates_to) = if self.root().base().is_group_chat() {
            let parameters = ConversationParameters {
                bot: reference.bot.clone(),
                members: vec![user.clone()],
                is_group: false,
                tenant_id: reference.conversation.tenant_id.clone(),
            };
            let conversation = self
                .turn()
                .outbound
                .sender()
                .create_conversation(reference, parameters, self.cancellation())
                .await?;
            info!(conversation_id = %conversation.id, "created 1:1 conversation for sign-in");
            (reference.with_conversation(conversation), Some(reference.clone()))
        } else {
            (reference.clone(), None)
        };
        let target = ConversationReference {
            user: Some(user),
            ..target
        };

        let state = TokenExchangeState {
            connection_name: connection_name.clone(),
            conversation: target.clone(),
            relates_to,
            ms_app_id: self.turn().options.app_id.clone(),
        }
        .encode()?;
        let resource = tokens.get_sign_in_resource(&state).await?;

        let card = OAuthCard {
            text: &options.text,
            connection_name: &connection_name,
            buttons: [CardAction {
                action_type: "signin",
                title: &options.title,
                value: &resource.sign_in_link,
            }],
            token_exchange_resource: resource.token_exchange_resource.as_ref(),
            token_post_resource: resource.token_post_resource.as_ref(),
        };
        let message = MessageActivity::default().with_attachment(Attachment::new(
            OAUTH_CARD_CONTENT_TYPE,
            serde_json::to_value(&card)?,
        ));
        let sent = self.send_to(message.into(), &target, false).await?;
        Ok(SignInOutcome::Pending(sent))
    }

    /// Remove the user's token for `connection_name`, or for the app's
    /// configured connection.
    pub async fn sign_out(&self, connection_name: Option<&str>) -> Result<()> {
        let tokens = self.token_client()?;
        let connection_name = self.connection_name(connection_name)?;
        let user = user_of(self.root())?;
        tokens
            .sign_out(&user.id, &connection_name, &self.reference().channel_id)
            .await
    }
}

fn precondition_failed(body: TokenExchangeInvokeResponse) -> InvokeResponse {
    InvokeResponse::json(&body).status(412)
}

/// `signin/tokenExchange`: exchange the SSO token the client obtained.
pub(crate) fn token_exchange_route() -> Route {
    Route::system(
        TokenExchangeActivity::ROUTE_NAME,
        |a: &Activity| TokenExchangeActivity::narrow(a).is_some(),
        |ctx: TurnContext| async move {
            let ctx = ctx.as_type::<TokenExchangeActivity>()?;
            let request = &ctx.activity().value;
            let mut body = TokenExchangeInvokeResponse {
                id: request.id.clone(),
                connection_name: request.connection_name.clone(),
                failure_detail: None,
            };
            let (Some(token), Ok(connection_name)) = (
                request.token.as_deref(),
                ctx.connection_name(request.connection_name.as_deref()),
            ) else {
                body.failure_detail = Some(EXCHANGE_FAILED.into());
                return Ok(Some(precondition_failed(body)));
            };
            let user = user_of(ctx.root())?;
            let exchanged = ctx
                .token_client()?
                .exchange_token(&user.id, &connection_name, &ctx.reference().channel_id, token)
                .await;
            match exchanged {
                Ok(Some(_)) => {
                    body.connection_name = Some(connection_name);
                    let next = ctx.next().await?;
                    Ok(Some(next.unwrap_or_else(|| InvokeResponse::json(&body))))
                },
                Ok(None) => {
                    body.failure_detail = Some(EXCHANGE_FAILED.into());
                    Ok(Some(precondition_failed(body)))
                },
                Err(e) if e.is_cancelled() => Err(e),
                Err(e) => {
                    warn!(error = %e, connection = %connection_name, "token exchange failed");
                    body.failure_detail = Some(EXCHANGE_FAILED.into());
                    Ok(Some(precondition_failed(body)))
                },
            }
        },
    )
}

/// `signin/verifyState`: redeem the magic code the user typed back.
pub(crate) fn verify_state_route() -> Route {
    Route::system(
        VerifyStateActivity::ROUTE_NAME,
        |a: &Activity| VerifyStateActivity::narrow(a).is_some(),
        |ctx: TurnContext| async move {
            let ctx = ctx.as_type::<VerifyStateActivity>()?;
            let Some(code) = ctx.activity().value.state.as_deref() else {
                return Ok(Some(InvokeResponse::with_status(412)));
            };
            let connection_name = match ctx.connection_name(None) {
                Ok(name) => name,
                Err(e) => {
                    warn!(error = %e, "cannot verify sign-in state");
                    return Ok(Some(InvokeResponse::with_status(412)));
                },
            };
            let user = user_of(ctx.root())?;
            let token = ctx
                .token_client()?
                .get_user_token(&user.id, &connection_name, &ctx.reference().channel_id, Some(code))
                .await?;
            if token.is_none() {
                info!(connection = %connection_name, "magic code rejected");
                return Ok(Some(InvokeResponse::with_status(412)));
            }
            let next = ctx.next().await?;
            Ok(Some(next.unwrap_or_else(InvokeResponse::ok)))
        },
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, teamwire_activity::ConversationAccount};

    #[test]
    fn exchange_state_is_base64_json() {
        let state = TokenExchangeState {
            connection_name: "graph".into(),
            conversation: ConversationReference {
                channel_id: "msteams".into(),
                conversation: ConversationAccount::new("a:1"),
                ..ConversationReference::default()
            },
            relates_to: None,
            ms_app_id: Some("app-1".into()),
        };
        let encoded = state.encode().unwrap();
        let raw: Value = serde_json::from_slice(&STANDARD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(raw["connectionName"], "graph");
        assert_eq!(raw["msAppId"], "app-1");
        assert!(raw.get("relatesTo").is_none());
        assert_eq!(TokenExchangeState::decode(&encoded).unwrap(), state);
    }

    #[test]
    fn garbage_state_is_rejected() {
        assert!(TokenExchangeState::decode("not base64!").is_err());
    }

    #[test]
    fn oauth_card_omits_missing_resources() {
        let card = OAuthCard {
            text: "Please sign in",
            connection_name: "graph",
            buttons: [CardAction {
                action_type: "signin",
                title: "Sign in",
                value: "https://token.example/sign-in",
            }],
            token_exchange_resource: None,
            token_post_resource: None,
        };
        assert_eq!(
            serde_json::to_string(&card).unwrap(),
            r#"{"text":"Please sign in","connectionName":"graph","buttons":[{"type":"signin","title":"Sign in","value":"https://token.example/sign-in"}]}"#
        );
    }
}
