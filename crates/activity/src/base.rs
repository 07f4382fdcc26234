use serde_json::{Map, Value};

use crate::{
    account::{Account, ConversationAccount, ConversationReference},
    attachment::Attachment,
    channel_data::ChannelData,
    entity::{self, Entity},
    error::Result,
    fields::{FieldWriter, Fields},
};

/// Fields every activity carries, whatever its type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityBase {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub local_timestamp: Option<String>,
    pub channel_id: Option<String>,
    pub service_url: Option<String>,
    pub locale: Option<String>,
    pub from: Option<Account>,
    pub recipient: Option<Account>,
    pub conversation: Option<ConversationAccount>,
    pub reply_to_id: Option<String>,
    pub entities: Vec<Entity>,
    pub attachments: Vec<Attachment>,
    pub channel_data: Option<ChannelData>,
    /// Unrecognized top-level keys, re-emitted after all typed fields.
    pub properties: Map<String, Value>,
}

impl ActivityBase {
    pub(crate) fn decode(fields: &mut Fields) -> Result<Self> {
        let entities = match fields.take::<Vec<Value>>("entities")? {
            Some(raw) => entity::decode_all(raw)?,
            None => Vec::new(),
        };
        Ok(Self {
            id: fields.take("id")?,
            timestamp: fields.take("timestamp")?,
            local_timestamp: fields.take("localTimestamp")?,
            channel_id: fields.take("channelId")?,
            service_url: fields.take("serviceUrl")?,
            locale: fields.take("locale")?,
            from: fields.take("from")?,
            recipient: fields.take("recipient")?,
            conversation: fields.take("conversation")?,
            reply_to_id: fields.take("replyToId")?,
            entities,
            attachments: fields.take_or_default("attachments")?,
            channel_data: fields.take("channelData")?,
            properties: Map::new(),
        })
    }

    /// Conventional fields, in wire order. Open properties are written last
    /// by the caller once the variant's own fields are in.
    pub(crate) fn encode(&self, out: &mut FieldWriter) {
        out.put_opt("id", self.id.as_ref());
        out.put_opt("timestamp", self.timestamp.as_ref());
        out.put_opt("localTimestamp", self.local_timestamp.as_ref());
        out.put_opt("channelId", self.channel_id.as_ref());
        out.put_opt("serviceUrl", self.service_url.as_ref());
        out.put_opt("locale", self.locale.as_ref());
        out.put_opt("from", self.from.as_ref());
        out.put_opt("recipient", self.recipient.as_ref());
        out.put_opt("conversation", self.conversation.as_ref());
        out.put_opt("replyToId", self.reply_to_id.as_ref());
        if self.entities.is_empty() {
            out.put_list::<Value>("entities", &[]);
        } else {
            out.put_value(
                "entities",
                Value::Array(self.entities.iter().map(Entity::encode).collect()),
            );
        }
        out.put_list("attachments", &self.attachments);
        out.put_opt("channelData", self.channel_data.as_ref());
    }

    /// Addressing for replies: the inbound recipient is the bot, the
    /// inbound sender is the user.
    pub fn conversation_reference(&self) -> ConversationReference {
        ConversationReference {
            bot: self.recipient.clone().unwrap_or_default(),
            channel_id: self.channel_id.clone().unwrap_or_default(),
            conversation: self.conversation.clone().unwrap_or_default(),
            service_url: self.service_url.clone().unwrap_or_default(),
            activity_id: self.id.clone(),
            locale: self.locale.clone(),
            user: self.from.clone(),
        }
    }

    /// Address an outbound activity from a reference.
    pub fn apply_reference(&mut self, reference: &ConversationReference) {
        self.channel_id = Some(reference.channel_id.clone());
        self.service_url = Some(reference.service_url.clone());
        self.from = Some(reference.bot.clone());
        self.recipient = reference.user.clone();
        self.conversation = Some(reference.conversation.clone());
        if self.locale.is_none() {
            self.locale = reference.locale.clone();
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.id.as_str())
    }

    pub fn is_group_chat(&self) -> bool {
        if self.conversation.as_ref().is_some_and(ConversationAccount::is_group_chat) {
            return true;
        }
        self.channel_data
            .as_ref()
            .is_some_and(ChannelData::is_team_scoped)
    }

    /// Whether the recipient (normally the bot) is @mentioned.
    pub fn is_recipient_mentioned(&self) -> bool {
        let Some(recipient_id) = self.recipient.as_ref().map(|r| r.id.as_str()) else {
            return false;
        };
        self.entities.iter().any(|entity| {
            matches!(entity, Entity::Mention(m) if m.mentioned.id == recipient_id)
        })
    }
}
