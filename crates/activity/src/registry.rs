//! Maps discriminator paths to concrete activity shapes.
//!
//! A path is an ordered list of segments. The first always tests the top-level
//! `type`; further segments test invoke `name` (exactly or by prefix) or a
//! string field inside `value`. When several registered paths match a
//! payload the most specific one wins: more segments first, then longer
//! literals, then exact over prefix.

use std::fmt;

use serde_json::Value;

use crate::{
    activity::{Activity, ActivityVariant, WireShape},
    conversation::{
        ConversationUpdateActivity, EndOfConversationActivity, InstallationUpdateActivity,
    },
    error::{DecodeError, RegistryError, Result},
    event::EventActivity,
    fields::Fields,
    invoke::{
        GenericInvokeActivity, adaptive_card, config, execute_action, file_consent, handoff,
        message, message_extension as mx, search, sign_in, tab, task,
    },
    message::{
        MessageActivity, MessageDeleteActivity, MessageReactionActivity, MessageUpdateActivity,
        TypingActivity,
    },
};

/// Builds an [`Activity`] from a drained payload. The top-level `type` has
/// already been consumed when this runs.
pub type DecodeFn = fn(&mut Fields) -> Result<Activity>;

/// Where a segment reads its string from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// A top-level field such as `type` or `name`.
    Top(&'static str),
    /// A field of the `value` object.
    Value(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Matcher {
    fn matches(self, candidate: &str) -> bool {
        match self {
            Self::Exact(expected) => candidate == expected,
            Self::Prefix(prefix) => candidate.starts_with(prefix),
        }
    }

    fn literal_len(self) -> usize {
        match self {
            Self::Exact(s) | Self::Prefix(s) => s.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub field: FieldRef,
    pub matcher: Matcher,
}

impl Segment {
    fn read<'a>(&self, fields: &'a Fields) -> Option<&'a str> {
        match self.field {
            FieldRef::Top(key) => fields.peek_str(key),
            FieldRef::Value(key) => fields
                .peek("value")
                .and_then(|value| value.get(key))
                .and_then(Value::as_str),
        }
    }

    fn matches(&self, fields: &Fields) -> bool {
        self.read(fields).is_some_and(|s| self.matcher.matches(s))
    }
}

/// An ordered sequence of segments identifying one shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscriminatorPath {
    segments: Vec<Segment>,
}

impl DiscriminatorPath {
    /// Start a path at a top-level `type`.
    pub fn kind(kind: &'static str) -> Self {
        Self {
            segments: vec![Segment {
                field: FieldRef::Top("type"),
                matcher: Matcher::Exact(kind),
            }],
        }
    }

    /// An invoke path: `type == "invoke"` and `name == name`.
    pub fn invoke(name: &'static str) -> Self {
        Self::kind("invoke").name(name)
    }

    #[must_use]
    pub fn name(self, name: &'static str) -> Self {
        self.segment(FieldRef::Top("name"), Matcher::Exact(name))
    }

    #[must_use]
    pub fn name_prefix(self, prefix: &'static str) -> Self {
        self.segment(FieldRef::Top("name"), Matcher::Prefix(prefix))
    }

    /// Third-level segment on a string inside `value`.
    #[must_use]
    pub fn value_field(self, key: &'static str, expected: &'static str) -> Self {
        self.segment(FieldRef::Value(key), Matcher::Exact(expected))
    }

    #[must_use]
    pub fn segment(mut self, field: FieldRef, matcher: Matcher) -> Self {
        self.segments.push(Segment { field, matcher });
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn root_kind(&self) -> Option<&'static str> {
        match self.segments.first() {
            Some(Segment {
                field: FieldRef::Top("type"),
                matcher: Matcher::Exact(kind),
            }) => Some(*kind),
            _ => None,
        }
    }

    fn matches(&self, fields: &Fields) -> bool {
        self.segments.iter().all(|segment| segment.matches(fields))
    }

    fn specificity(&self) -> (usize, usize, usize) {
        let literal = self.segments.iter().map(|p| p.matcher.literal_len()).sum();
        let exact = self
            .segments
            .iter()
            .filter(|p| matches!(p.matcher, Matcher::Exact(_)))
            .count();
        (self.segments.len(), literal, exact)
    }
}

impl fmt::Display for DiscriminatorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            match segment.field {
                FieldRef::Top(key) => write!(f, "{key}")?,
                FieldRef::Value(key) => write!(f, "value.{key}")?,
            }
            match segment.matcher {
                Matcher::Exact(s) => write!(f, "={s}")?,
                Matcher::Prefix(s) => write!(f, "^={s}")?,
            }
        }
        Ok(())
    }
}

/// One registered shape.
#[derive(Debug, Clone)]
pub struct Shape {
    pub path: DiscriminatorPath,
    pub type_name: &'static str,
    pub decode: DecodeFn,
}

fn decode_as<T>(fields: &mut Fields) -> Result<Activity>
where
    T: WireShape + Into<Activity>,
{
    T::decode(fields).map(Into::into)
}

#[derive(Debug, Clone, Default)]
pub struct ActivityRegistry {
    shapes: Vec<Shape>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every activity shape this crate defines.
    pub fn standard() -> Self {
        Self {
            shapes: standard_shapes(),
        }
    }

    /// Register a decoder under `path`. Registering the same path twice, or a
    /// path that does not start with a `type` segment, is rejected.
    pub fn register(
        &mut self,
        path: DiscriminatorPath,
        type_name: &'static str,
        decode: DecodeFn,
    ) -> std::result::Result<(), RegistryError> {
        if path.root_kind().is_none() {
            return Err(RegistryError::MissingRoot(path.to_string()));
        }
        if self.shapes.iter().any(|shape| shape.path == path) {
            return Err(RegistryError::DuplicatePath(path.to_string()));
        }
        self.shapes.push(Shape {
            path,
            type_name,
            decode,
        });
        Ok(())
    }

    /// Register a shape type; its [`WireShape`] impl supplies the decoder.
    pub fn register_shape<T>(
        &mut self,
        path: DiscriminatorPath,
    ) -> std::result::Result<(), RegistryError>
    where
        T: WireShape + ActivityVariant + Into<Activity>,
    {
        self.register(path, T::TYPE_NAME, decode_as::<T>)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Find the most specific shape for a payload. `type` must be present
    /// and a non-empty string; a `type` no path starts with is unknown.
    pub fn resolve(&self, fields: &Fields) -> Result<&Shape> {
        let Some(kind) = fields.peek_str("type").filter(|kind| !kind.is_empty()) else {
            return Err(DecodeError::missing("type"));
        };
        let mut best: Option<&Shape> = None;
        for shape in &self.shapes {
            if !shape.path.matches(fields) {
                continue;
            }
            let better = match best {
                Some(current) => shape.path.specificity() > current.path.specificity(),
                None => true,
            };
            if better {
                best = Some(shape);
            }
        }
        best.ok_or_else(|| DecodeError::unknown("type", kind))
    }
}

fn shape<T>(path: DiscriminatorPath) -> Shape
where
    T: WireShape + ActivityVariant + Into<Activity>,
{
    Shape {
        path,
        type_name: T::TYPE_NAME,
        decode: decode_as::<T>,
    }
}

fn standard_shapes() -> Vec<Shape> {
    use DiscriminatorPath as P;

    const PREVIEW: &str = "botMessagePreviewAction";
    vec![
        shape::<MessageActivity>(P::kind("message")),
        shape::<MessageUpdateActivity>(P::kind("messageUpdate")),
        shape::<MessageDeleteActivity>(P::kind("messageDelete")),
        shape::<MessageReactionActivity>(P::kind("messageReaction")),
        shape::<TypingActivity>(P::kind("typing")),
        shape::<ConversationUpdateActivity>(P::kind("conversationUpdate")),
        shape::<InstallationUpdateActivity>(P::kind("installationUpdate")),
        shape::<EndOfConversationActivity>(P::kind("endOfConversation")),
        shape::<EventActivity>(P::kind("event")),
        shape::<GenericInvokeActivity>(P::kind("invoke")),
        shape::<adaptive_card::ActionActivity>(P::invoke(adaptive_card::ActionActivity::NAME)),
        shape::<config::FetchActivity>(P::invoke(config::FetchActivity::NAME)),
        shape::<config::SubmitActivity>(P::invoke(config::SubmitActivity::NAME)),
        shape::<mx::QueryActivity>(P::invoke(mx::QueryActivity::NAME)),
        shape::<mx::QuerySettingUrlActivity>(P::invoke(mx::QuerySettingUrlActivity::NAME)),
        shape::<mx::SettingActivity>(P::invoke(mx::SettingActivity::NAME)),
        shape::<mx::SelectItemActivity>(P::invoke(mx::SelectItemActivity::NAME)),
        shape::<mx::SubmitActionActivity>(P::invoke(mx::SubmitActionActivity::NAME)),
        shape::<mx::BotMessagePreviewEditActivity>(
            P::invoke(mx::BotMessagePreviewEditActivity::NAME).value_field(PREVIEW, "edit"),
        ),
        shape::<mx::BotMessagePreviewSendActivity>(
            P::invoke(mx::BotMessagePreviewSendActivity::NAME).value_field(PREVIEW, "send"),
        ),
        shape::<mx::FetchTaskActivity>(P::invoke(mx::FetchTaskActivity::NAME)),
        shape::<mx::QueryLinkActivity>(P::invoke(mx::QueryLinkActivity::NAME)),
        shape::<mx::AnonymousQueryLinkActivity>(P::invoke(mx::AnonymousQueryLinkActivity::NAME)),
        shape::<mx::CardButtonClickedActivity>(P::invoke(mx::CardButtonClickedActivity::NAME)),
        shape::<sign_in::TokenExchangeActivity>(P::invoke(sign_in::TokenExchangeActivity::NAME)),
        shape::<sign_in::VerifyStateActivity>(P::invoke(sign_in::VerifyStateActivity::NAME)),
        shape::<tab::FetchActivity>(P::invoke(tab::FetchActivity::NAME)),
        shape::<tab::SubmitActivity>(P::invoke(tab::SubmitActivity::NAME)),
        shape::<task::FetchActivity>(P::invoke(task::FetchActivity::NAME)),
        shape::<task::SubmitActivity>(P::invoke(task::SubmitActivity::NAME)),
        shape::<file_consent::FileConsentActivity>(P::invoke(
            file_consent::FileConsentActivity::NAME,
        )),
        shape::<handoff::HandoffActivity>(P::invoke(handoff::HandoffActivity::NAME)),
        shape::<search::SearchActivity>(P::invoke(search::SearchActivity::NAME)),
        shape::<execute_action::ExecuteActionActivity>(P::invoke(
            execute_action::ExecuteActionActivity::NAME,
        )),
        shape::<message::SubmitActionActivity>(P::invoke(message::SubmitActionActivity::NAME)),
        shape::<message::FeedbackActivity>(
            P::invoke(message::FeedbackActivity::NAME).value_field("actionName", "feedback"),
        ),
    ]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        rstest::rstest,
        serde_json::{Map, json},
    };

    use DiscriminatorPath as P;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => Fields::new(map),
            _ => Fields::new(Map::new()),
        }
    }

    #[test]
    fn standard_paths_are_unique() {
        let mut registry = ActivityRegistry::new();
        for shape in standard_shapes() {
            registry
                .register(shape.path, shape.type_name, shape.decode)
                .unwrap();
        }
        assert_eq!(registry.shapes().len(), ActivityRegistry::standard().shapes().len());
    }

    #[test]
    fn duplicate_path_fails_at_registration() {
        let mut registry = ActivityRegistry::new();
        registry
            .register_shape::<tab::FetchActivity>(P::invoke("tab/fetch"))
            .unwrap();
        let err = registry
            .register_shape::<tab::SubmitActivity>(P::invoke("tab/fetch"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePath(p) if p == "type=invoke / name=tab/fetch"));
    }

    #[test]
    fn path_without_type_root_is_rejected() {
        let mut registry = ActivityRegistry::new();
        let path = DiscriminatorPath {
            segments: vec![Segment {
                field: FieldRef::Top("name"),
                matcher: Matcher::Exact("x"),
            }],
        };
        let err = registry
            .register_shape::<MessageActivity>(path)
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingRoot(_)));
    }

    #[rstest]
    #[case(json!({"type": "message"}), "MessageActivity")]
    #[case(json!({"type": "invoke", "name": "tab/fetch"}), "FetchActivity")]
    #[case(json!({"type": "invoke", "name": "unmapped/thing"}), "GenericInvokeActivity")]
    #[case(
        json!({"type": "invoke", "name": "composeExtension/submitAction", "value": {"botMessagePreviewAction": "edit"}}),
        "BotMessagePreviewEditActivity"
    )]
    #[case(
        json!({"type": "invoke", "name": "composeExtension/submitAction", "value": {"botMessagePreviewAction": "other"}}),
        "SubmitActionActivity"
    )]
    #[case(
        json!({"type": "invoke", "name": "message/submitAction", "value": {"actionName": "feedback"}}),
        "FeedbackActivity"
    )]
    fn resolves_most_specific(#[case] payload: Value, #[case] expected: &str) {
        let registry = ActivityRegistry::standard();
        let shape = registry.resolve(&fields(payload)).unwrap();
        assert_eq!(shape.type_name, expected);
    }

    #[test]
    fn prefix_loses_to_exact() {
        let mut registry = ActivityRegistry::new();
        registry
            .register_shape::<GenericInvokeActivity>(P::kind("invoke").name_prefix("tab/"))
            .unwrap();
        registry
            .register_shape::<tab::FetchActivity>(P::invoke("tab/fetch"))
            .unwrap();
        let fetch = registry
            .resolve(&fields(json!({"type": "invoke", "name": "tab/fetch"})))
            .unwrap();
        assert_eq!(fetch.path, P::invoke("tab/fetch"));
        let other = registry
            .resolve(&fields(json!({"type": "invoke", "name": "tab/other"})))
            .unwrap();
        assert_eq!(other.type_name, "GenericInvokeActivity");
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = ActivityRegistry::standard()
            .resolve(&fields(json!({"type": "poke"})))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnknownDiscriminator { ref field, ref value } if field == "type" && value == "poke"
        ));
    }

    #[test]
    fn non_string_type_is_missing() {
        let err = ActivityRegistry::standard()
            .resolve(&fields(json!({"type": 3})))
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator(ref f) if f == "type"));
    }
}
