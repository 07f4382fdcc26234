//! Field-level helpers shared by every activity shape.
//!
//! Decoding works by draining a JSON object: each typed field is removed as
//! it is read, so whatever is left once a shape has taken its fields becomes
//! the open property map. Encoding mirrors that with [`FieldWriter`], which
//! emits fields in call order and remembers every key a shape owns so the
//! open map can never shadow a typed field.

use {
    serde::{Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
    tracing::warn,
};

use crate::error::{DecodeError, Result};

/// A JSON object being consumed field by field.
#[derive(Debug, Default)]
pub struct Fields {
    map: Map<String, Value>,
}

impl Fields {
    pub fn new(map: Map<String, Value>) -> Self {
        Self { map }
    }

    /// Read a string field without consuming it.
    pub fn peek_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Remove a field and deserialize it. Absent and `null` both read as `None`.
    pub fn take<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.map.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|source| {
                DecodeError::InvalidField {
                    path: key.to_string(),
                    source,
                }
            }),
        }
    }

    pub fn take_or_default<T: DeserializeOwned + Default>(&mut self, key: &str) -> Result<T> {
        Ok(self.take(key)?.unwrap_or_default())
    }

    /// Remove a field and keep it as raw JSON.
    pub fn take_raw(&mut self, key: &str) -> Option<Value> {
        match self.map.remove(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// Remove a discriminator field, which must be a non-empty string.
    pub fn take_discriminator(&mut self, key: &str) -> Result<String> {
        match self.map.remove(key) {
            Some(Value::String(value)) if !value.is_empty() => Ok(value),
            _ => Err(DecodeError::missing(key)),
        }
    }

    /// Everything not consumed so far.
    pub fn into_rest(self) -> Map<String, Value> {
        self.map
    }
}

/// Builds a JSON object in a fixed field order.
#[derive(Debug, Default)]
pub struct FieldWriter {
    map: Map<String, Value>,
    reserved: Vec<&'static str>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a field unconditionally.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) {
        self.reserved.push(key);
        match serde_json::to_value(value) {
            Ok(value) => {
                self.map.insert(key.to_string(), value);
            },
            Err(e) => warn!(field = key, error = %e, "dropping unserializable field"),
        }
    }

    /// Write a field when present. The key is reserved either way.
    pub fn put_opt<T: Serialize>(&mut self, key: &'static str, value: Option<&T>) {
        match value {
            Some(value) => self.put(key, value),
            None => self.reserved.push(key),
        }
    }

    /// Write a list when non-empty. The key is reserved either way.
    pub fn put_list<T: Serialize>(&mut self, key: &'static str, values: &[T]) {
        if values.is_empty() {
            self.reserved.push(key);
        } else {
            self.put(key, values);
        }
    }

    /// Write a field unless it serializes to `null` or to the type's
    /// default. The key is reserved either way.
    pub fn put_unless_default<T: Serialize + Default>(&mut self, key: &'static str, value: &T) {
        let encoded = serde_json::to_value(value);
        let default = serde_json::to_value(T::default()).unwrap_or(Value::Null);
        match encoded {
            Ok(Value::Null) => self.reserved.push(key),
            Ok(value) if value == default => self.reserved.push(key),
            Ok(value) => self.put_value(key, value),
            Err(e) => {
                self.reserved.push(key);
                warn!(field = key, error = %e, "dropping unserializable field");
            },
        }
    }

    pub fn put_value(&mut self, key: &'static str, value: Value) {
        self.reserved.push(key);
        self.map.insert(key.to_string(), value);
    }

    /// Append open properties. Keys owned by a typed field, or already
    /// written, are skipped.
    pub fn merge(&mut self, properties: &Map<String, Value>) {
        for (key, value) in properties {
            if self.reserved.contains(&key.as_str()) || self.map.contains_key(key) {
                continue;
            }
            self.map.insert(key.clone(), value.clone());
        }
    }

    pub fn finish(self) -> Map<String, Value> {
        self.map
    }
}
