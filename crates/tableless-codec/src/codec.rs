//! Column codecs: moving a tableless record in and out of its host column.
//!
//! The raw column value is the host engine's structured literal
//! (`serde_json::Value`):
//!
//! - **Plain**: the record's JSON object is handed to the host as is; the
//!   host's own structured-column serialization stores it.
//! - **Encrypted**: the record is serialized to JSON text, encrypted, and the
//!   resulting text is stored. The host's structured serialization is
//!   bypassed for such columns.

use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tableless_core::{CodecError, CodecErrorKind, Result, Schema, TablelessRecord};

use crate::config::EncryptionConfig;
use crate::encryptor::MessageEncryptor;

/// The per-column codec strategy, chosen once at declaration time.
#[derive(Debug, Clone, Default)]
pub enum Codec {
    /// Structured literal, serialized by the host engine.
    #[default]
    Plain,
    /// Serialize-then-encrypt / decrypt-then-deserialize.
    Encrypted(Arc<MessageEncryptor>),
}

impl Codec {
    pub fn plain() -> Self {
        Codec::Plain
    }

    /// Encrypted codec with keys derived from `config`.
    pub fn encrypted(config: &EncryptionConfig) -> Result<Self> {
        Ok(Codec::Encrypted(Arc::new(MessageEncryptor::new(config)?)))
    }

    /// Encrypted codec for a bare secret, with default key derivation.
    pub fn with_key(secret: &str) -> Result<Self> {
        Self::encrypted(&EncryptionConfig::new(secret))
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Codec::Encrypted(_))
    }

    /// True when the host should apply its structured-column serialization
    /// to this column.
    pub fn uses_host_serialization(&self) -> bool {
        matches!(self, Codec::Plain)
    }

    /// Encode `record` into a raw column value.
    pub fn encode(&self, record: &TablelessRecord) -> Result<JsonValue> {
        match self {
            Codec::Plain => Ok(record.to_json()),
            Codec::Encrypted(encryptor) => {
                let serialized = serde_json::to_vec(record).map_err(|e| {
                    CodecError::new(CodecErrorKind::Serialize, "record serialization failed")
                        .with_source(e)
                })?;
                let ciphertext = encryptor.encrypt(&serialized)?;
                tracing::debug!(
                    model = record.model_name(),
                    bytes = ciphertext.len(),
                    "Encrypted tableless record"
                );
                Ok(JsonValue::String(ciphertext))
            }
        }
    }

    /// Decode a raw column value into the stored attribute map.
    ///
    /// `Ok(None)` means the column holds nothing yet (null or empty text).
    pub fn decode(&self, raw: &JsonValue) -> Result<Option<JsonMap<String, JsonValue>>> {
        match (self, raw) {
            (_, JsonValue::Null) => Ok(None),
            (_, JsonValue::String(text)) if text.trim().is_empty() => Ok(None),
            (Codec::Plain, JsonValue::Object(map)) => Ok(Some(map.clone())),
            (Codec::Plain, JsonValue::String(text)) => parse_object(text.as_bytes()).map(Some),
            (Codec::Encrypted(encryptor), JsonValue::String(text)) => {
                let plaintext = encryptor.decrypt(text)?;
                parse_object(&plaintext).map(Some)
            }
            (_, other) => Err(CodecError::new(
                CodecErrorKind::Deserialize,
                format!(
                    "unexpected raw column value for {} codec: {}",
                    self.name(),
                    json_kind(other)
                ),
            )
            .into()),
        }
    }

    /// Materialize the record stored in `raw`, or a fresh one when the
    /// column is empty.
    pub fn materialize(&self, schema: Arc<Schema>, raw: Option<&JsonValue>) -> Result<TablelessRecord> {
        let decoded = match raw {
            Some(raw) => self.decode(raw)?,
            None => None,
        };
        match decoded {
            Some(map) => TablelessRecord::from_json_map(schema, &map),
            None => Ok(TablelessRecord::new(schema)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Codec::Plain => "plain",
            Codec::Encrypted(_) => "encrypted",
        }
    }
}

fn parse_object(bytes: &[u8]) -> Result<JsonMap<String, JsonValue>> {
    let parsed: JsonValue = serde_json::from_slice(bytes).map_err(|e| {
        CodecError::new(CodecErrorKind::Deserialize, "stored text is not valid JSON").with_source(e)
    })?;
    match parsed {
        JsonValue::Object(map) => Ok(map),
        other => Err(CodecError::new(
            CodecErrorKind::Deserialize,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )
        .into()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tableless_core::{AttrType, AttributeOptions, Value};

    fn settings_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("ModelSettings")
                .attribute("some_attribute", AttributeOptions::new().default("default value"))
                .attribute("count", AttrType::Integer)
                .build(),
        )
    }

    fn encrypted() -> Codec {
        Codec::encrypted(&EncryptionConfig::new("a398bbfaac38c79e60a6e398efba8571").with_iterations(16))
            .unwrap()
    }

    #[test]
    fn test_plain_encode_is_structured_literal() {
        let record = TablelessRecord::new(settings_schema());
        let raw = Codec::plain().encode(&record).unwrap();
        assert_eq!(raw, json!({"some_attribute": "default value", "count": 0}));
        assert!(Codec::plain().uses_host_serialization());
    }

    #[test]
    fn test_plain_decode_accepts_object_or_text() {
        let codec = Codec::plain();
        let from_object = codec
            .materialize(settings_schema(), Some(&json!({"count": "3"})))
            .unwrap();
        assert_eq!(from_object.get("count").unwrap(), Value::Int(3));
        assert_eq!(
            from_object.get("some_attribute").unwrap(),
            Value::Text("default value".to_string())
        );

        let from_text = codec
            .materialize(settings_schema(), Some(&json!(r#"{"count": 4}"#)))
            .unwrap();
        assert_eq!(from_text.get("count").unwrap(), Value::Int(4));
    }

    #[test]
    fn test_empty_column_materializes_fresh_record() {
        for raw in [None, Some(json!(null)), Some(json!(""))] {
            let record = Codec::plain().materialize(settings_schema(), raw.as_ref()).unwrap();
            assert_eq!(record, TablelessRecord::new(settings_schema()));
        }
    }

    #[test]
    fn test_encrypted_round_trip_stores_ciphertext() {
        let codec = encrypted();
        let record = TablelessRecord::with_attributes(
            settings_schema(),
            [("some_attribute", "non default value")],
        )
        .unwrap();

        let raw = codec.encode(&record).unwrap();
        let text = raw.as_str().unwrap();
        assert!(!text.contains("non default value"));
        assert_ne!(raw, Codec::plain().encode(&record).unwrap());
        assert!(!codec.uses_host_serialization());

        let back = codec.materialize(settings_schema(), Some(&raw)).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_overflowing_float_survives_round_trip() {
        let schema = Arc::new(Schema::builder("Measure").attribute("x", AttrType::Float).build());
        let mut record = TablelessRecord::new(Arc::clone(&schema));
        record.set("x", "1e400").unwrap();

        for codec in [Codec::plain(), encrypted()] {
            let raw = codec.encode(&record).unwrap();
            let back = codec.materialize(Arc::clone(&schema), Some(&raw)).unwrap();
            assert_eq!(back, record);
            assert_eq!(back.get("x").unwrap(), Value::Float(0.0));
        }
    }

    #[test]
    fn test_encrypted_encoding_is_stable() {
        let codec = encrypted();
        let record = TablelessRecord::new(settings_schema());
        assert_eq!(codec.encode(&record).unwrap(), codec.encode(&record).unwrap());
    }

    #[test]
    fn test_decode_failures_surface() {
        let err = Codec::plain().decode(&json!("{not json")).unwrap_err();
        assert!(err.is_codec());
        assert!(Codec::plain().decode(&json!([1, 2])).is_err());
        assert!(Codec::plain().decode(&json!("[1, 2]")).is_err());

        let codec = encrypted();
        assert!(codec.decode(&json!("encrypted...")).is_err());
        assert!(codec.decode(&json!({"some_attribute": "x"})).is_err());
    }

    #[test]
    fn test_undeclared_stored_key_fails() {
        let err = Codec::plain()
            .materialize(settings_schema(), Some(&json!({"removed": 1})))
            .unwrap_err();
        assert!(err.is_attribute_undefined());
    }
}
