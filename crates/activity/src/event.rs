use serde_json::Value;

use crate::{
    activity::{Activity, WireShape, activity_variant},
    base::ActivityBase,
    error::Result,
    fields::{FieldWriter, Fields},
};

/// `event`: a named, fire-and-forget notification (meeting start/end,
/// read receipts and similar).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventActivity {
    pub base: ActivityBase,
    pub name: Option<String>,
    pub value: Option<Value>,
    pub relates_to: Option<Value>,
}

impl EventActivity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

impl WireShape for EventActivity {
    fn decode(fields: &mut Fields) -> Result<Self> {
        Ok(Self {
            base: ActivityBase::decode(fields)?,
            name: fields.take("name")?,
            value: fields.take_raw("value"),
            relates_to: fields.take_raw("relatesTo"),
        })
    }

    fn encode(&self, out: &mut FieldWriter) {
        out.put("type", "event");
        out.put_opt("name", self.name.as_ref());
        self.base.encode(out);
        out.put_opt("value", self.value.as_ref());
        out.put_opt("relatesTo", self.relates_to.as_ref());
    }
}

activity_variant!(EventActivity, "event", |a| Activity::Event(a));
