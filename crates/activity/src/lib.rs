//! Typed Bot Framework activities and their JSON codec.
//!
//! Inbound payloads are resolved through an [`ActivityRegistry`] of
//! discriminator paths (`type`, then invoke `name`, then a field inside
//! `value`) and decoded into the closed [`Activity`] union. Keys no shape
//! claims survive in each activity's open property map and are written back
//! after the typed fields on encode.

pub mod account;
pub mod activity;
pub mod attachment;
pub mod base;
pub mod channel_data;
pub mod codec;
pub mod conversation;
pub mod entity;
pub mod error;
pub mod event;
pub mod fields;
pub mod invoke;
pub mod message;
pub mod registry;
pub mod response;

pub use {
    account::{Account, ConversationAccount, ConversationReference},
    activity::{Activity, ActivityVariant, WireShape},
    attachment::{ADAPTIVE_CARD_CONTENT_TYPE, Attachment, OAUTH_CARD_CONTENT_TYPE},
    base::ActivityBase,
    channel_data::ChannelData,
    codec::ActivityCodec,
    conversation::{
        ConversationUpdateActivity, EndOfConversationActivity, InstallationUpdateActivity,
    },
    entity::Entity,
    error::{DecodeError, RegistryError, Result},
    event::EventActivity,
    invoke::{GenericInvokeActivity, InvokeActivity},
    message::{
        MessageActivity, MessageDeleteActivity, MessageReactionActivity, MessageUpdateActivity,
        TypingActivity,
    },
    registry::{ActivityRegistry, DiscriminatorPath},
    response::{
        AdaptiveCardActionResponse, InvokeResponse, TaskModuleResponse,
        TokenExchangeInvokeResponse,
    },
};
