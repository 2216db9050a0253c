//! Decoding raw message text into `{type, data}` envelopes.

use serde_json::{Map, Value};

use crate::diagnostics::DispatchError;

/// One decoded server-pushed event.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// The `type` tag, not yet checked against the binding table.
    pub kind: String,
    /// The `data` payload. `None` when absent or `null`.
    pub data: Option<Value>,
}

impl Envelope {
    /// Build an envelope; `null` data is treated as absent.
    pub fn new(kind: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            data: data.filter(|value| !value.is_null()),
        }
    }

    /// Decode and shape-check one raw message.
    ///
    /// Invalid JSON is a [`DispatchError::Decode`]; valid JSON that is not an
    /// object carrying a string `type` is a [`DispatchError::Schema`]. Top
    /// level fields other than `type` and `data` are ignored.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| DispatchError::Decode {
            message: e.to_string(),
            raw: raw.to_string(),
        })?;

        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(DispatchError::Schema {
                    found: json_type_name(&other),
                    raw: raw.to_string(),
                })
            }
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(DispatchError::Schema {
                    found: type_field_name(&other),
                    raw: raw.to_string(),
                })
            }
            None => {
                return Err(DispatchError::Schema {
                    found: "no type field",
                    raw: raw.to_string(),
                })
            }
        };

        Ok(Self::new(kind, fields.remove("data")))
    }

    /// The payload as an object, if it is one.
    pub fn data_object(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()?.as_object()
    }

    /// Look up one payload key. Always `None` when the payload is not an
    /// object.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data_object()?.get(key)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_field_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null type",
        Value::Bool(_) => "boolean type",
        Value::Number(_) => "number type",
        Value::String(_) => "string type",
        Value::Array(_) => "array type",
        Value::Object(_) => "object type",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_type_and_data() {
        let env = Envelope::parse(r#"{"type":"status","data":{"status":"ONLINE"}}"#).unwrap();
        assert_eq!(env.kind, "status");
        assert_eq!(env.field("status"), Some(&json!("ONLINE")));
    }

    #[test]
    fn null_data_is_absent() {
        let env = Envelope::parse(r#"{"type":"agent","data":null}"#).unwrap();
        assert!(env.data.is_none());
        let env = Envelope::parse(r#"{"type":"agent"}"#).unwrap();
        assert!(env.data.is_none());
    }

    #[test]
    fn extra_top_level_fields_are_ignored() {
        let env = Envelope::parse(r#"{"type":"contract","data":{"id":"C1"},"agent":{"id":"A"}}"#)
            .unwrap();
        assert_eq!(env.kind, "contract");
        assert_eq!(env.field("id"), Some(&json!("C1")));
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = Envelope::parse("not json").unwrap_err();
        assert!(matches!(&err, DispatchError::Decode { raw, .. } if raw == "not json"));
    }

    #[test]
    fn non_object_is_a_schema_error() {
        for (raw, found) in [("null", "null"), ("[1]", "array"), ("42", "number"), (r#""x""#, "string")] {
            let err = Envelope::parse(raw).unwrap_err();
            assert_eq!(
                err,
                DispatchError::Schema {
                    found,
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn missing_or_non_string_type_is_a_schema_error() {
        let err = Envelope::parse(r#"{"data":{}}"#).unwrap_err();
        assert!(matches!(err, DispatchError::Schema { found: "no type field", .. }));

        let err = Envelope::parse(r#"{"type":7,"data":{}}"#).unwrap_err();
        assert!(matches!(err, DispatchError::Schema { found: "number type", .. }));
    }

    #[test]
    fn field_lookup_on_non_object_payload_is_none() {
        let env = Envelope::new("agent", Some(json!("A1")));
        assert!(env.data.is_some());
        assert!(env.data_object().is_none());
        assert!(env.field("id").is_none());
    }
}
