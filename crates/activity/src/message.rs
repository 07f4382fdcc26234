use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{
    activity::{Activity, WireShape, activity_variant},
    attachment::Attachment,
    base::ActivityBase,
    error::Result,
    fields::{FieldWriter, Fields},
};

/// `message`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageActivity {
    pub base: ActivityBase,
    pub text: Option<String>,
    pub text_format: Option<String>,
    pub speak: Option<String>,
    pub input_hint: Option<String>,
    pub summary: Option<String>,
    pub importance: Option<String>,
    pub delivery_mode: Option<String>,
    pub attachment_layout: Option<String>,
    pub suggested_actions: Option<Value>,
    pub value: Option<Value>,
}

impl MessageActivity {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.base.attachments.push(attachment);
        self
    }

    pub fn with_text_format(mut self, format: impl Into<String>) -> Self {
        self.text_format = Some(format.into());
        self
    }

    /// Text with `<at>…</at>` mention markup removed and whitespace trimmed.
    /// `None` when nothing remains.
    pub fn text_without_mentions(&self) -> Option<String> {
        let mut text = self.text.clone()?;
        while let Some(start) = text.find("<at>") {
            let Some(end_rel) = text[start + 4..].find("</at>") else {
                break;
            };
            let end = start + 4 + end_rel + 5;
            text.replace_range(start..end, "");
        }
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn is_recipient_mentioned(&self) -> bool {
        self.base.is_recipient_mentioned()
    }
}

impl From<&str> for MessageActivity {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for MessageActivity {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<Attachment> for MessageActivity {
    fn from(attachment: Attachment) -> Self {
        Self::default().with_attachment(attachment)
    }
}

impl WireShape for MessageActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            text: fields.take("text")?,
            text_format: fields.take("textFormat")?,
            speak: fields.take("speak")?,
            input_hint: fields.take("inputHint")?,
            summary: fields.take("summary")?,
            importance: fields.take("importance")?,
            delivery_mode: fields.take("deliveryMode")?,
            attachment_layout: fields.take("attachmentLayout")?,
            suggested_actions: fields.take_raw("suggestedActions"),
            value: fields.take_raw("value"),
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "message");
        self.base.encode(out);
        out.put_opt("text", self.text.as_ref());
        out.put_opt("textFormat", self.text_format.as_ref());
        out.put_opt("speak", self.speak.as_ref());
        out.put_opt("inputHint", self.input_hint.as_ref());
        out.put_opt("summary", self.summary.as_ref());
        out.put_opt("importance", self.importance.as_ref());
        out.put_opt("deliveryMode", self.delivery_mode.as_ref());
        out.put_opt("attachmentLayout", self.attachment_layout.as_ref());
        out.put_opt("suggestedActions", self.suggested_actions.as_ref());
        out.put_opt("value", self.value.as_ref());
    }
}

activity_variant!(MessageActivity, "message", |a| Activity::Message(a));

/// `messageUpdate`: an edited or undeleted message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageUpdateActivity {
    pub base: ActivityBase,
    pub text: Option<String>,
    pub value: Option<Value>,
}

impl WireShape for MessageUpdateActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            text: fields.take("text")?,
            value: fields.take_raw("value"),
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "messageUpdate");
        self.base.encode(out);
        out.put_opt("text", self.text.as_ref());
        out.put_opt("value", self.value.as_ref());
    }
}

activity_variant!(MessageUpdateActivity, "messageUpdate", |a| Activity::MessageUpdate(a));

/// `messageDelete`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDeleteActivity {
    pub base: ActivityBase,
}

impl WireShape for MessageDeleteActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "messageDelete");
        self.base.encode(out);
    }
}

activity_variant!(MessageDeleteActivity, "messageDelete", |a| Activity::MessageDelete(a));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageReaction {
    #[serde(rename = "type")]
    pub reaction_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// `messageReaction`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageReactionActivity {
    pub base: ActivityBase,
    pub reactions_added: Vec<MessageReaction>,
    pub reactions_removed: Vec<MessageReaction>,
}

impl WireShape for MessageReactionActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            reactions_added: fields.take_or_default("reactionsAdded")?,
            reactions_removed: fields.take_or_default("reactionsRemoved")?,
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "messageReaction");
        self.base.encode(out);
        out.put_list("reactionsAdded", &self.reactions_added);
        out.put_list("reactionsRemoved", &self.reactions_removed);
    }
}

activity_variant!(MessageReactionActivity, "messageReaction", |a| Activity::MessageReaction(a));

/// `typing`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypingActivity {
    pub base: ActivityBase,
}

impl TypingActivity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WireShape for TypingActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "typing");
        self.base.encode(out);
    }
}

activity_variant!(TypingActivity, "typing", |a| Activity::Typing(a));

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_mention_markup() {
        let message = MessageActivity::new("<at>Helper</at> what's the weather?");
        assert_eq!(
            message.text_without_mentions().as_deref(),
            Some("what's the weather?")
        );
    }

    #[test]
    fn mention_only_text_is_empty() {
        let message = MessageActivity::new("  <at>Helper</at>  ");
        assert!(message.text_without_mentions().is_none());
    }

    #[test]
    fn unclosed_mention_is_left_alone() {
        let message = MessageActivity::new("<at>Helper hi");
        assert_eq!(message.text_without_mentions().as_deref(), Some("<at>Helper hi"));
    }

    #[test]
    fn narrowing_checks_the_tag() {
        let activity = Activity::from(MessageActivity::new("hi"));
        assert!(activity.narrow::<MessageActivity>().is_some());
        assert!(activity.narrow::<TypingActivity>().is_none());
        assert_eq!(activity.type_name(), "MessageActivity");
    }
}
