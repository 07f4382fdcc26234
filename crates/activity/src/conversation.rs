use crate::{
    account::Account,
    activity::{Activity, WireShape, activity_variant},
    base::ActivityBase,
    error::Result,
    fields::{FieldWriter, Fields},
};

/// `conversationUpdate`. One physical event type covers members joining or
/// leaving, renames and the Teams channel/team lifecycle events carried in
/// `channelData.eventType`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationUpdateActivity {
    pub base: ActivityBase,
    pub members_added: Vec<Account>,
    pub members_removed: Vec<Account>,
    pub topic_name: Option<String>,
    pub history_disclosed: Option<bool>,
}

impl ConversationUpdateActivity {
    /// `channelData.eventType`, e.g. `channelCreated` or `teamRenamed`.
    pub fn event_type(&self) -> Option<&str> {
        self.base.channel_data.as_ref()?.event_type.as_deref()
    }

    /// Added members other than the recipient itself.
    pub fn members_added_excluding_recipient(&self) -> impl Iterator<Item = &Account> {
        let recipient = self.base.recipient.as_ref().map(|r| r.id.as_str());
        self.members_added
            .iter()
            .filter(move |member| Some(member.id.as_str()) != recipient)
    }
}

impl WireShape for ConversationUpdateActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            members_added: fields.take_or_default("membersAdded")?,
            members_removed: fields.take_or_default("membersRemoved")?,
            topic_name: fields.take("topicName")?,
            history_disclosed: fields.take("historyDisclosed")?,
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "conversationUpdate");
        self.base.encode(out);
        out.put_list("membersAdded", &self.members_added);
        out.put_list("membersRemoved", &self.members_removed);
        out.put_opt("topicName", self.topic_name.as_ref());
        out.put_opt("historyDisclosed", self.history_disclosed.as_ref());
    }
}

activity_variant!(ConversationUpdateActivity, "conversationUpdate", |a| Activity::ConversationUpdate(a));

/// `installationUpdate`: the app was added to or removed from a scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallationUpdateActivity {
    pub base: ActivityBase,
    /// `add`, `remove`, `add-upgrade` or `remove-upgrade`.
    pub action: Option<String>,
}

impl WireShape for InstallationUpdateActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            action: fields.take("action")?,
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "installationUpdate");
        self.base.encode(out);
        out.put_opt("action", self.action.as_ref());
    }
}

activity_variant!(InstallationUpdateActivity, "installationUpdate", |a| Activity::InstallationUpdate(a));

/// `endOfConversation`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndOfConversationActivity {
    pub base: ActivityBase,
    pub code: Option<String>,
    pub text: Option<String>,
}

impl WireShape for EndOfConversationActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            code: fields.take("code")?,
            text: fields.take("text")?,
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "endOfConversation");
        self.base.encode(out);
        out.put_opt("code", self.code.as_ref());
        out.put_opt("text", self.text.as_ref());
    }
}

activity_variant!(EndOfConversationActivity, "endOfConversation", |a| Activity::EndOfConversation(a));
