//! Invoke activities: request/response sub-protocols keyed by `name`.
//!
//! Leaves are declared with [`invoke_leaf!`], families (several leaves under
//! one `name` prefix) with [`invoke_family!`]. Names nothing is registered
//! for decode as [`GenericInvokeActivity`].

use serde_json::Value;

use crate::{
    activity::{Activity, ActivityVariant, WireShape, activity_variant},
    base::ActivityBase,
    error::Result,
    fields::{FieldWriter, Fields},
};

pub mod adaptive_card;
pub mod config;
pub mod execute_action;
pub mod file_consent;
pub mod handoff;
pub mod message;
pub mod message_extension;
pub mod search;
pub mod sign_in;
pub mod tab;
pub mod task;

/// Declares a single invoke shape: a struct with `base` and a typed
/// `value`, its wire form, and its narrowing.
macro_rules! invoke_leaf {
    (
        $(#[$meta:meta])*
        $ty:ident = $name:literal, $value:ty, |$bind:ident| $($variant:tt)+
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $ty {
            pub base: $crate::ActivityBase,
            pub value: $value,
        }

        impl $ty {
            /// Invoke `name` this shape is registered under.
            pub const NAME: &'static str = $name;

            pub fn new(value: $value) -> Self {
                Self {
                    base: $crate::ActivityBase::default(),
                    value,
                }
            }
        }

        impl $crate::activity::WireShape for $ty {
            fn decode(fields: &mut $crate::fields::Fields) -> $crate::error::Result<Self> {
                fields.take_raw("name");
                let base = $crate::ActivityBase::decode(fields)?;
                let value = fields.take_or_default("value")?;
                Ok(Self { base, value })
            }

            fn encode(&self, out: &mut $crate::fields::FieldWriter) {
                out.put("type", "invoke");
                out.put("name", Self::NAME);
                self.base.encode(out);
                out.put_unless_default("value", &self.value);
            }
        }

        $crate::activity::activity_variant!($ty, concat!("invoke/", $name), |$bind| $($variant)+);
    };
}

/// Declares a family enum over leaves sharing a `name` prefix.
macro_rules! invoke_family {
    (
        $(#[$meta:meta])*
        $family:ident, $route:literal, |$bind:ident| ($($variant:tt)+),
        { $($leaf:ident($leaf_ty:ty)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $family {
            $($leaf($leaf_ty)),+
        }

        impl $family {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$leaf(_) => <$leaf_ty>::NAME),+
                }
            }

            pub fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$leaf(_) => <$leaf_ty as $crate::ActivityVariant>::TYPE_NAME),+
                }
            }

            pub fn base(&self) -> &$crate::ActivityBase {
                match self {
                    $(Self::$leaf(a) => &a.base),+
                }
            }

            pub fn base_mut(&mut self) -> &mut $crate::ActivityBase {
                match self {
                    $(Self::$leaf(a) => &mut a.base),+
                }
            }

            pub(crate) fn encode(&self, out: &mut $crate::fields::FieldWriter) {
                match self {
                    $(Self::$leaf(a) => $crate::activity::WireShape::encode(a, out)),+
                }
            }
        }

        $(
            impl From<$leaf_ty> for $family {
                fn from(leaf: $leaf_ty) -> Self {
                    Self::$leaf(leaf)
                }
            }
        )+

        impl From<$family> for $crate::Activity {
            fn from($bind: $family) -> Self {
                $($variant)+
            }
        }

        impl $crate::ActivityVariant for $family {
            const ROUTE_NAME: &'static str = $route;
            const TYPE_NAME: &'static str = stringify!($family);

            fn narrow(activity: &$crate::Activity) -> Option<&Self> {
                match activity {
                    $($variant)+ => Some($bind),
                    _ => None,
                }
            }

            fn base(&self) -> &$crate::ActivityBase {
                $family::base(self)
            }
        }
    };
}

pub(crate) use {invoke_family, invoke_leaf};

/// `invoke`, resolved to its family.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeActivity {
    AdaptiveCardAction(adaptive_card::ActionActivity),
    Config(config::ConfigActivity),
    MessageExtension(message_extension::MessageExtensionActivity),
    SignIn(sign_in::SignInActivity),
    Tab(tab::TabActivity),
    Task(task::TaskActivity),
    FileConsent(file_consent::FileConsentActivity),
    Handoff(handoff::HandoffActivity),
    Search(search::SearchActivity),
    ExecuteAction(execute_action::ExecuteActionActivity),
    Message(message::MessageInvokeActivity),
    Generic(GenericInvokeActivity),
}

impl InvokeActivity {
    pub fn name(&self) -> &str {
        match self {
            Self::AdaptiveCardAction(_) => adaptive_card::ActionActivity::NAME,
            Self::Config(a) => a.name(),
            Self::MessageExtension(a) => a.name(),
            Self::SignIn(a) => a.name(),
            Self::Tab(a) => a.name(),
            Self::Task(a) => a.name(),
            Self::FileConsent(_) => file_consent::FileConsentActivity::NAME,
            Self::Handoff(_) => handoff::HandoffActivity::NAME,
            Self::Search(_) => search::SearchActivity::NAME,
            Self::ExecuteAction(_) => execute_action::ExecuteActionActivity::NAME,
            Self::Message(a) => a.name(),
            Self::Generic(a) => &a.name,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AdaptiveCardAction(_) => adaptive_card::ActionActivity::TYPE_NAME,
            Self::Config(a) => a.type_name(),
            Self::MessageExtension(a) => a.type_name(),
            Self::SignIn(a) => a.type_name(),
            Self::Tab(a) => a.type_name(),
            Self::Task(a) => a.type_name(),
            Self::FileConsent(_) => file_consent::FileConsentActivity::TYPE_NAME,
            Self::Handoff(_) => handoff::HandoffActivity::TYPE_NAME,
            Self::Search(_) => search::SearchActivity::TYPE_NAME,
            Self::ExecuteAction(_) => execute_action::ExecuteActionActivity::TYPE_NAME,
            Self::Message(a) => a.type_name(),
            Self::Generic(_) => GenericInvokeActivity::TYPE_NAME,
        }
    }

    pub fn base(&self) -> &ActivityBase {
        match self {
            Self::AdaptiveCardAction(a) => &a.base,
            Self::Config(a) => a.base(),
            Self::MessageExtension(a) => a.base(),
            Self::SignIn(a) => a.base(),
            Self::Tab(a) => a.base(),
            Self::Task(a) => a.base(),
            Self::FileConsent(a) => &a.base,
            Self::Handoff(a) => &a.base,
            Self::Search(a) => &a.base,
            Self::ExecuteAction(a) => &a.base,
            Self::Message(a) => a.base(),
            Self::Generic(a) => &a.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ActivityBase {
        match self {
            Self::AdaptiveCardAction(a) => &mut a.base,
            Self::Config(a) => a.base_mut(),
            Self::MessageExtension(a) => a.base_mut(),
            Self::SignIn(a) => a.base_mut(),
            Self::Tab(a) => a.base_mut(),
            Self::Task(a) => a.base_mut(),
            Self::FileConsent(a) => &mut a.base,
            Self::Handoff(a) => &mut a.base,
            Self::Search(a) => &mut a.base,
            Self::ExecuteAction(a) => &mut a.base,
            Self::Message(a) => a.base_mut(),
            Self::Generic(a) => &mut a.base,
        }
    }

    pub(crate) fn encode(&self, out: &mut FieldWriter) {
        match self {
            Self::AdaptiveCardAction(a) => a.encode(out),
            Self::Config(a) => a.encode(out),
            Self::MessageExtension(a) => a.encode(out),
            Self::SignIn(a) => a.encode(out),
            Self::Tab(a) => a.encode(out),
            Self::Task(a) => a.encode(out),
            Self::FileConsent(a) => a.encode(out),
            Self::Handoff(a) => a.encode(out),
            Self::Search(a) => a.encode(out),
            Self::ExecuteAction(a) => a.encode(out),
            Self::Message(a) => a.encode(out),
            Self::Generic(a) => a.encode(out),
        }
    }
}

impl ActivityVariant for InvokeActivity {
    const ROUTE_NAME: &'static str = "invoke";
    const TYPE_NAME: &'static str = "InvokeActivity";

    fn narrow(activity: &Activity) -> Option<&Self> {
        match activity {
            Activity::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    fn base(&self) -> &ActivityBase {
        InvokeActivity::base(self)
    }
}

impl From<InvokeActivity> for Activity {
    fn from(invoke: InvokeActivity) -> Self {
        Activity::Invoke(invoke)
    }
}

/// An invoke whose `name` has no registered shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericInvokeActivity {
    pub base: ActivityBase,
    pub name: String,
    pub value: Option<Value>,
}

impl WireShape for GenericInvokeActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        let name = fields.take_discriminator("name")?;
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            name,
            value: fields.take_raw("value"),
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "invoke");
        out.put("name", &self.name);
        self.base.encode(out);
        out.put_opt("value", self.value.as_ref());
    }
}

activity_variant!(GenericInvokeActivity, "invoke", |a| Activity::Invoke(InvokeActivity::Generic(a)));
