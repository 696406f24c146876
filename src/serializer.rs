//!
//! Serializers turn application values into message bodies and back.
//!
//! Values are modelled as [`serde_json::Value`] so that a serializer can be held behind
//! `Arc<dyn Serializer>` and swapped without touching the composer.
//!
use crate::error::SerializationError;
use bytes::Bytes;
use serde_json::Value;

/// Encodes and decodes payload values. Implementations must satisfy
/// `deserialize(serialize(v)) == v` for every value they accept.
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<Bytes, SerializationError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, SerializationError>;
}

/// JSON encoding backed by `serde_json`.
#[derive(Debug, Default, Clone)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Bytes, SerializationError> {
        let buf = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(Bytes::from(buf))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, SerializationError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Plain text encoding for string values.
///
/// Strings are written verbatim and decode back to strings. Every other value is rejected,
/// since its type could not be recovered from the text.
#[derive(Debug, Default, Clone)]
pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn serialize(&self, value: &Value) -> Result<Bytes, SerializationError> {
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            other => Err(SerializationError::Unrepresentable(value_kind(other))),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, SerializationError> {
        let text = String::from_utf8(bytes.to_vec())?;
        Ok(Value::String(text))
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let serializer = JsonSerializer::new();
        let value = json!({"id": 42, "tags": ["a", "b"], "nested": {"ok": true}, "none": null});
        let bytes = serializer.serialize(&value)?;
        assert_eq!(serializer.deserialize(&bytes)?, value);
        Ok(())
    }

    #[test]
    fn test_json_pretty_output_decodes() -> Result<(), Box<dyn std::error::Error>> {
        let serializer = JsonSerializer::pretty();
        let value = json!({"a": 1});
        let bytes = serializer.serialize(&value)?;
        assert!(bytes.contains(&b'\n'));
        assert_eq!(JsonSerializer::new().deserialize(&bytes)?, value);
        Ok(())
    }

    #[test]
    fn test_json_malformed_bytes() {
        let result = JsonSerializer::new().deserialize(b"{\"unterminated\": ");
        assert!(matches!(result, Err(SerializationError::Json(_))));
    }

    #[test]
    fn test_text_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let serializer = TextSerializer;
        for value in [json!("test"), json!(""), json!("12"), json!("{\"a\": 1}"), json!("żółw")] {
            let bytes = serializer.serialize(&value)?;
            assert_eq!(serializer.deserialize(&bytes)?, value);
        }
        assert_eq!(serializer.serialize(&json!("test"))?, Bytes::from("test"));
        Ok(())
    }

    #[test]
    fn test_text_rejects_non_strings() {
        let serializer = TextSerializer;
        let rejected = [
            (json!(12), "number"),
            (json!(false), "bool"),
            (json!([1, 2]), "array"),
            (json!({"a": 1}), "object"),
            (Value::Null, "null"),
        ];
        for (value, kind) in rejected {
            match serializer.serialize(&value) {
                Err(SerializationError::Unrepresentable(k)) => assert_eq!(k, kind),
                other => panic!("expected {} to be rejected, got {:?}", kind, other),
            }
        }
    }

    #[test]
    fn test_text_invalid_utf8() {
        let result = TextSerializer.deserialize(&[0xff, 0xfe]);
        assert!(matches!(result, Err(SerializationError::InvalidUtf8(_))));
    }
}
