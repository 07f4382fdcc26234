//! Registry-driven decode and order-preserving encode.

use {
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::{
    activity::Activity,
    error::{DecodeError, Result},
    fields::Fields,
    registry::ActivityRegistry,
};

/// Accepted on decode in place of `type`.
const KIND_ALIAS: &str = "kind";

#[derive(Debug, Clone)]
pub struct ActivityCodec {
    registry: ActivityRegistry,
}

impl Default for ActivityCodec {
    fn default() -> Self {
        Self::new(ActivityRegistry::standard())
    }
}

impl ActivityCodec {
    pub fn new(registry: ActivityRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActivityRegistry {
        &self.registry
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Activity> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.decode_value(value)
    }

    pub fn decode_str(&self, text: &str) -> Result<Activity> {
        self.decode(text.as_bytes())
    }

    /// Decode an already-parsed payload. Typed fields are drained from the
    /// object; what is left becomes the activity's open properties.
    pub fn decode_value(&self, value: Value) -> Result<Activity> {
        let Value::Object(mut map) = value else {
            return Err(DecodeError::NotAnObject);
        };
        normalize_kind(&mut map);
        let mut fields = Fields::new(map);

        let shape = self.registry.resolve(&fields)?;
        if fields.peek_str("type") == Some("invoke")
            && fields.peek_str("name").is_none_or(str::is_empty)
        {
            return Err(DecodeError::missing("name"));
        }
        fields.take_raw("type");

        let mut activity = (shape.decode)(&mut fields)?;
        activity.base_mut().properties = fields.into_rest();
        debug!(
            activity_type = activity.type_name(),
            activity_id = activity.id().unwrap_or_default(),
            "decoded activity"
        );
        Ok(activity)
    }

    /// Encode dispatches on the activity's own variant; it never re-reads
    /// discriminators and cannot fail.
    pub fn encode(&self, activity: &Activity) -> Vec<u8> {
        self.encode_string(activity).into_bytes()
    }

    pub fn encode_string(&self, activity: &Activity) -> String {
        Value::Object(activity.to_fields()).to_string()
    }

    pub fn encode_value(&self, activity: &Activity) -> Value {
        Value::Object(activity.to_fields())
    }
}

/// Rewrite a `kind` discriminator to `type`, keeping its position.
fn normalize_kind(map: &mut Map<String, Value>) {
    if map.contains_key("type") || !map.contains_key(KIND_ALIAS) {
        return;
    }
    let entries = std::mem::take(map);
    for (key, value) in entries {
        if key == KIND_ALIAS {
            map.insert("type".to_string(), value);
        } else {
            map.insert(key, value);
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            ActivityVariant,
            invoke::{GenericInvokeActivity, InvokeActivity, tab},
            message::MessageActivity,
        },
        rstest::rstest,
        serde_json::json,
    };

    fn codec() -> ActivityCodec {
        ActivityCodec::default()
    }

    #[test]
    fn kind_alias_is_accepted() {
        let activity = codec().decode_str(r#"{"kind":"message","text":"hi"}"#).unwrap();
        let message = activity.narrow::<MessageActivity>().unwrap();
        assert_eq!(message.text.as_deref(), Some("hi"));
        assert!(activity.base().properties.is_empty());
    }

    #[test]
    fn invoke_without_name_is_missing_name() {
        let err = codec().decode_str(r#"{"kind":"invoke"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator(ref f) if f == "name"));
    }

    #[test]
    fn invoke_with_numeric_name_is_missing_name() {
        let err = codec().decode_str(r#"{"type":"invoke","name":5}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator(ref f) if f == "name"));
    }

    #[rstest]
    #[case(r#"{"type":"invoke","name":""}"#, "name")]
    #[case(r#"{"kind":"invoke","name":"","value":{}}"#, "name")]
    #[case(r#"{"type":""}"#, "type")]
    #[case(r#"{"kind":"","text":"hi"}"#, "type")]
    fn empty_discriminator_is_missing(#[case] payload: &str, #[case] field: &str) {
        let err = codec().decode_str(payload).unwrap_err();
        assert!(
            matches!(err, DecodeError::MissingDiscriminator(ref f) if f == field),
            "{payload}: {err}"
        );
    }

    #[test]
    fn unmapped_invoke_is_generic() {
        let activity = codec()
            .decode_str(r#"{"kind":"invoke","name":"unmapped/thing","value":{"a":1}}"#)
            .unwrap();
        let generic = activity.narrow::<GenericInvokeActivity>().unwrap();
        assert_eq!(generic.name, "unmapped/thing");
        assert_eq!(generic.value, Some(json!({"a": 1})));
        assert_eq!(activity.invoke_name(), Some("unmapped/thing"));
    }

    #[test]
    fn missing_type_is_reported() {
        let err = codec().decode_str(r#"{"text":"hi"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator(ref f) if f == "type"));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(
            codec().decode_str("[1,2]").unwrap_err(),
            DecodeError::NotAnObject
        ));
        assert!(matches!(
            codec().decode_str("{not json").unwrap_err(),
            DecodeError::Syntax(_)
        ));
    }

    #[test]
    fn unknown_fields_land_in_properties() {
        let activity = codec()
            .decode_str(r#"{"type":"message","text":"hi","x-custom":{"deep":true}}"#)
            .unwrap();
        let properties = &activity.base().properties;
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["x-custom"], json!({"deep": true}));
    }

    #[test]
    fn invalid_value_reports_path() {
        let err = codec()
            .decode_str(r#"{"type":"invoke","name":"tab/fetch","value":{"tabContext":7}}"#)
            .unwrap_err();
        match err {
            DecodeError::InvalidField { path, .. } => assert_eq!(path, "value"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_entity_reports_index() {
        let err = codec()
            .decode_str(r#"{"type":"message","entities":[{"text":"no type"}]}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingDiscriminator(ref f) if f == "entities[0].type"));
    }

    #[test]
    fn decoded_tab_submit_narrows_to_submit() {
        let activity = codec()
            .decode_str(r#"{"type":"invoke","name":"tab/submit","value":{"data":{"k":"v"}}}"#)
            .unwrap();
        assert_eq!(activity.type_name(), tab::SubmitActivity::TYPE_NAME);
        assert!(activity.narrow::<tab::FetchActivity>().is_none());
        assert!(matches!(
            activity,
            Activity::Invoke(InvokeActivity::Tab(tab::TabActivity::Submit(_)))
        ));
    }

    #[test]
    fn encode_writes_type_not_kind() {
        let activity = codec().decode_str(r#"{"kind":"typing"}"#).unwrap();
        assert_eq!(codec().encode_string(&activity), r#"{"type":"typing"}"#);
    }
}
