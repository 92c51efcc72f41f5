//! Conversions between Value and serde types.
//!
//! Option structs and typed worker payloads go through `serde_json::Value`
//! on their way to and from the native `Value` tree.

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result, Value};

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    let json = value_to_json(value)?;
    serde_json::from_value(json).map_err(|e| Error::Decode(e.to_string()))
}

/// Convert a Rust type to a Value via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value> {
    let json = serde_json::to_value(data).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(json_to_value(json))
}

/// Convert our Value to serde_json::Value.
///
/// Native objects and callbacks have no JSON form and fail with `Encode`.
pub fn value_to_json(value: Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Bytes(b) => {
            // JSON doesn't have bytes, so we base64 encode
            let encoded = base64::engine::general_purpose::STANDARD.encode(&b);
            serde_json::Value::String(encoded)
        }
        Value::Array(arr) => serde_json::Value::Array(
            arr.into_iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| Ok((k, value_to_json(v)?)))
                .collect::<Result<serde_json::Map<_, _>>>()?,
        ),
        other @ (Value::Object(_) | Value::Function(_)) => {
            return Err(Error::Encode(format!(
                "{} values cannot be serialized",
                other.kind()
            )))
        }
    })
}

/// Convert serde_json::Value to our Value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                // Fallback for very large numbers
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Callback;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Command {
        op: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u32>,
    }

    #[test]
    fn struct_to_map() {
        let value = to_value(&Command {
            op: "ping".into(),
            seq: None,
        })
        .unwrap();
        assert_eq!(value.field("op"), Some(&Value::from("ping")));
        assert_eq!(value.field("seq"), None);
    }

    #[test]
    fn map_to_struct() {
        let mut value = Value::map();
        value.insert("op", Value::from("pong"));
        value.insert("seq", Value::from(3i64));
        let cmd: Command = from_value(value).unwrap();
        assert_eq!(
            cmd,
            Command {
                op: "pong".into(),
                seq: Some(3)
            }
        );
    }

    #[test]
    fn bytes_become_base64() {
        let json = value_to_json(Value::Bytes(b"hi".to_vec())).unwrap();
        assert_eq!(json, serde_json::Value::String("aGk=".into()));
    }

    #[test]
    fn callbacks_do_not_serialize() {
        let value = Value::Array(vec![Value::Function(Callback::new(|_| {}))]);
        assert!(matches!(value_to_json(value), Err(Error::Encode(_))));
    }

    #[test]
    fn decode_mismatch() {
        let result: Result<Command> = from_value(Value::from(1i64));
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
