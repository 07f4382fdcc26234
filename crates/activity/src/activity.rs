use serde_json::{Map, Value};

use crate::{
    account::ConversationReference,
    base::ActivityBase,
    conversation::{
        ConversationUpdateActivity, EndOfConversationActivity, InstallationUpdateActivity,
    },
    error::Result,
    event::EventActivity,
    fields::{FieldWriter, Fields},
    invoke::InvokeActivity,
    message::{
        MessageActivity, MessageDeleteActivity, MessageReactionActivity, MessageUpdateActivity,
        TypingActivity,
    },
};

/// A decoded activity. Each variant is a closed family; invoke activities
/// nest two more levels below [`InvokeActivity`].
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Message(MessageActivity),
    MessageUpdate(MessageUpdateActivity),
    MessageDelete(MessageDeleteActivity),
    MessageReaction(MessageReactionActivity),
    Typing(TypingActivity),
    ConversationUpdate(ConversationUpdateActivity),
    InstallationUpdate(InstallationUpdateActivity),
    EndOfConversation(EndOfConversationActivity),
    Event(EventActivity),
    Invoke(InvokeActivity),
}

/// A concrete shape an [`Activity`] can be narrowed to.
///
/// Narrowing is a tag check: it succeeds only when the decoded variant is
/// this type (or, for family types, one of its members).
pub trait ActivityVariant: Clone + Send + Sync + 'static {
    /// Name reported in cast failures.
    const TYPE_NAME: &'static str;
    /// Conventional route name, `<topKind>/<subKind>`.
    const ROUTE_NAME: &'static str;

    fn narrow(activity: &Activity) -> Option<&Self>;

    fn base(&self) -> &ActivityBase;
}

/// Wire form of one concrete shape: discriminators, then conventional
/// fields, then the shape's own fields.
pub trait WireShape: Sized {
    fn decode(fields: &mut Fields) -> Result<Self>;

    fn encode(&self, out: &mut FieldWriter);
}

/// Implements [`ActivityVariant`] and `From<T> for Activity` for a shape
/// with a `base` field. The tokens after `|binding|` are used both as the
/// constructor expression and as the narrowing pattern.
macro_rules! activity_variant {
    ($ty:ident, $route:expr, |$bind:ident| $($variant:tt)+) => {
        impl From<$ty> for $crate::Activity {
            fn from($bind: $ty) -> Self {
                $($variant)+
            }
        }

        impl $crate::ActivityVariant for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);
            const ROUTE_NAME: &'static str = $route;

            fn narrow(activity: &$crate::Activity) -> Option<&Self> {
                match activity {
                    $($variant)+ => Some($bind),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            fn base(&self) -> &$crate::ActivityBase {
                &self.base
            }
        }
    };
}

pub(crate) use activity_variant;

impl ActivityVariant for Activity {
    const ROUTE_NAME: &'static str = "activity";
    const TYPE_NAME: &'static str = "Activity";

    fn narrow(activity: &Activity) -> Option<&Self> {
        Some(activity)
    }

    fn base(&self) -> &ActivityBase {
        Activity::base(self)
    }
}

impl Activity {
    /// Top-level wire discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::MessageUpdate(_) => "messageUpdate",
            Self::MessageDelete(_) => "messageDelete",
            Self::MessageReaction(_) => "messageReaction",
            Self::Typing(_) => "typing",
            Self::ConversationUpdate(_) => "conversationUpdate",
            Self::InstallationUpdate(_) => "installationUpdate",
            Self::EndOfConversation(_) => "endOfConversation",
            Self::Event(_) => "event",
            Self::Invoke(_) => "invoke",
        }
    }

    /// Name of the most specific decoded shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Message(_) => MessageActivity::TYPE_NAME,
            Self::MessageUpdate(_) => MessageUpdateActivity::TYPE_NAME,
            Self::MessageDelete(_) => MessageDeleteActivity::TYPE_NAME,
            Self::MessageReaction(_) => MessageReactionActivity::TYPE_NAME,
            Self::Typing(_) => TypingActivity::TYPE_NAME,
            Self::ConversationUpdate(_) => ConversationUpdateActivity::TYPE_NAME,
            Self::InstallationUpdate(_) => InstallationUpdateActivity::TYPE_NAME,
            Self::EndOfConversation(_) => EndOfConversationActivity::TYPE_NAME,
            Self::Event(_) => EventActivity::TYPE_NAME,
            Self::Invoke(invoke) => invoke.type_name(),
        }
    }

    pub fn base(&self) -> &ActivityBase {
        match self {
            Self::Message(a) => &a.base,
            Self::MessageUpdate(a) => &a.base,
            Self::MessageDelete(a) => &a.base,
            Self::MessageReaction(a) => &a.base,
            Self::Typing(a) => &a.base,
            Self::ConversationUpdate(a) => &a.base,
            Self::InstallationUpdate(a) => &a.base,
            Self::EndOfConversation(a) => &a.base,
            Self::Event(a) => &a.base,
            Self::Invoke(a) => a.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut ActivityBase {
        match self {
            Self::Message(a) => &mut a.base,
            Self::MessageUpdate(a) => &mut a.base,
            Self::MessageDelete(a) => &mut a.base,
            Self::MessageReaction(a) => &mut a.base,
            Self::Typing(a) => &mut a.base,
            Self::ConversationUpdate(a) => &mut a.base,
            Self::InstallationUpdate(a) => &mut a.base,
            Self::EndOfConversation(a) => &mut a.base,
            Self::Event(a) => &mut a.base,
            Self::Invoke(a) => a.base_mut(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    /// The invoke `name`, for invoke activities.
    pub fn invoke_name(&self) -> Option<&str> {
        match self {
            Self::Invoke(invoke) => Some(invoke.name()),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageActivity> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn conversation_reference(&self) -> ConversationReference {
        self.base().conversation_reference()
    }

    /// Narrow to a concrete shape.
    pub fn narrow<T: ActivityVariant>(&self) -> Option<&T> {
        T::narrow(self)
    }

    /// Wire object in contract order: discriminators, conventional fields,
    /// variant fields, then open properties.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut out = FieldWriter::new();
        match self {
            Self::Message(a) => a.encode(&mut out),
            Self::MessageUpdate(a) => a.encode(&mut out),
            Self::MessageDelete(a) => a.encode(&mut out),
            Self::MessageReaction(a) => a.encode(&mut out),
            Self::Typing(a) => a.encode(&mut out),
            Self::ConversationUpdate(a) => a.encode(&mut out),
            Self::InstallationUpdate(a) => a.encode(&mut out),
            Self::EndOfConversation(a) => a.encode(&mut out),
            Self::Event(a) => a.encode(&mut out),
            Self::Invoke(a) => a.encode(&mut out),
        }
        out.merge(&self.base().properties);
        out.finish()
    }
}
