//! Tagged entity values carried in an activity's `entities` list.

use serde_json::{Map, Value};

use crate::{
    account::Account,
    error::{DecodeError, Result},
    fields::{FieldWriter, Fields},
};

const SCHEMA_MESSAGE: &str = "https://schema.org/Message";

/// One entry of `entities`.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Mention(Mention),
    ClientInfo(ClientInfo),
    StreamInfo(StreamInfo),
    /// schema.org `Message` wrapper (AI labels, citations, feedback).
    Message(MessageEntity),
    /// Any other plain entity type, kept verbatim.
    Other {
        entity_type: String,
        properties: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mention {
    pub mentioned: Account,
    pub text: Option<String>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    pub locale: Option<String>,
    pub country: Option<String>,
    pub platform: Option<String>,
    pub timezone: Option<String>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    pub stream_id: Option<String>,
    pub stream_type: Option<String>,
    pub stream_sequence: Option<u64>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEntity {
    pub context: Option<String>,
    pub id: Option<String>,
    pub additional_type: Vec<String>,
    pub citation: Vec<Value>,
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn mention(mentioned: Account, text: impl Into<String>) -> Self {
        Self::Mention(Mention {
            mentioned,
            text: Some(text.into()),
            properties: Map::new(),
        })
    }

    /// The wire `type` of this entity.
    pub fn entity_type(&self) -> &str {
        match self {
            Self::Mention(_) => "mention",
            Self::ClientInfo(_) => "clientInfo",
            Self::StreamInfo(_) => "streaminfo",
            Self::Message(_) => SCHEMA_MESSAGE,
            Self::Other { entity_type, .. } => entity_type,
        }
    }

    pub(crate) fn decode(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(DecodeError::missing("type"));
        };
        let mut fields = Fields::new(map);
        let entity_type = fields.take_discriminator("type")?;
        let entity = match entity_type.as_str() {
            "mention" => Self::Mention(Mention {
                mentioned: fields.take_or_default("mentioned")?,
                text: fields.take("text")?,
                properties: fields.into_rest(),
            }),
            "clientInfo" => Self::ClientInfo(ClientInfo {
                locale: fields.take("locale")?,
                country: fields.take("country")?,
                platform: fields.take("platform")?,
                timezone: fields.take("timezone")?,
                properties: fields.into_rest(),
            }),
            "streaminfo" => Self::StreamInfo(StreamInfo {
                stream_id: fields.take("streamId")?,
                stream_type: fields.take("streamType")?,
                stream_sequence: fields.take("streamSequence")?,
                properties: fields.into_rest(),
            }),
            SCHEMA_MESSAGE => Self::Message(decode_schema_message(fields)?),
            _ => Self::Other {
                entity_type,
                properties: fields.into_rest(),
            },
        };
        Ok(entity)
    }

    pub(crate) fn encode(&self) -> Value {
        let mut out = FieldWriter::new();
        out.put("type", self.entity_type());
        let properties = match self {
            Self::Mention(m) => {
                out.put("mentioned", &m.mentioned);
                out.put_opt("text", m.text.as_ref());
                &m.properties
            },
            Self::ClientInfo(c) => {
                out.put_opt("locale", c.locale.as_ref());
                out.put_opt("country", c.country.as_ref());
                out.put_opt("platform", c.platform.as_ref());
                out.put_opt("timezone", c.timezone.as_ref());
                &c.properties
            },
            Self::StreamInfo(s) => {
                out.put_opt("streamId", s.stream_id.as_ref());
                out.put_opt("streamType", s.stream_type.as_ref());
                out.put_opt("streamSequence", s.stream_sequence.as_ref());
                &s.properties
            },
            Self::Message(m) => {
                out.put("@type", "Message");
                out.put_opt("@context", m.context.as_ref());
                out.put_opt("@id", m.id.as_ref());
                out.put_list("additionalType", &m.additional_type);
                out.put_list("citation", &m.citation);
                &m.properties
            },
            Self::Other { properties, .. } => properties,
        };
        out.merge(properties);
        Value::Object(out.finish())
    }
}

/// schema.org entities wrap a second discriminator in `@type`; only the
/// `Message` shape is understood.
fn decode_schema_message(mut fields: Fields) -> Result<MessageEntity> {
    let inner = fields.take_discriminator("@type")?;
    if inner != "Message" {
        return Err(DecodeError::unknown("@type", inner));
    }
    Ok(MessageEntity {
        context: fields.take("@context")?,
        id: fields.take("@id")?,
        additional_type: fields.take_or_default("additionalType")?,
        citation: fields.take_or_default("citation")?,
        properties: fields.into_rest(),
    })
}

/// Decode a raw `entities` array, prefixing errors with the element index.
pub(crate) fn decode_all(raw: Vec<Value>) -> Result<Vec<Entity>> {
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            Entity::decode(value).map_err(|e| e.within(&format!("entities[{index}]")))
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn mention_round_trips() {
        let raw = json!({
            "type": "mention",
            "mentioned": {"id": "28:bot", "name": "Helper"},
            "text": "<at>Helper</at>"
        });
        let entity = Entity::decode(raw.clone()).unwrap();
        assert!(matches!(&entity, Entity::Mention(m) if m.mentioned.id == "28:bot"));
        assert_eq!(entity.encode(), raw);
    }

    #[test]
    fn unknown_plain_type_is_kept() {
        let raw = json!({"type": "geoCoordinates", "latitude": 1.5});
        let entity = Entity::decode(raw.clone()).unwrap();
        assert_eq!(entity.entity_type(), "geoCoordinates");
        assert_eq!(entity.encode(), raw);
    }

    #[test]
    fn unknown_schema_type_is_rejected() {
        let raw = json!({"type": SCHEMA_MESSAGE, "@type": "Recipe"});
        let err = Entity::decode(raw).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnknownDiscriminator { ref field, ref value } if field == "@type" && value == "Recipe"
        ));
    }

    #[test]
    fn missing_type_names_the_element() {
        let err = decode_all(vec![json!({"type": "mention"}), json!({"text": "x"})]).unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator(ref f) if f == "entities[1].type"));
    }

    #[test]
    fn schema_message_round_trips() {
        let raw = json!({
            "type": SCHEMA_MESSAGE,
            "@type": "Message",
            "@context": "https://schema.org",
            "@id": "",
            "additionalType": ["AIGeneratedContent"]
        });
        let entity = Entity::decode(raw.clone()).unwrap();
        assert_eq!(entity.encode(), raw);
    }
}
