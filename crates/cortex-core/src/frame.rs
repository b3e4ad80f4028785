//! JSON transport frames for browser clients
//!
//! Outbound frames keep each argument's type tag:
//! ```text
//! {"address": "/brahma/organism/update", "args": [{"type": "s", "value": "p1"}, {"type": "f", "value": 0.5}]}
//! ```
//! Inbound frames carry plain JSON scalars and the wire type is inferred:
//! ```text
//! {"address": "/daemon/lorenz/create", "args": ["lorenz1", 10, 28, 2.667]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{Arg, Error, Message, Result};

/// Serialized shape of a message on the WebSocket side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportFrame {
    pub address: String,
    pub args: Vec<Arg>,
}

impl From<&Message> for TransportFrame {
    fn from(msg: &Message) -> Self {
        Self {
            address: msg.address.clone(),
            args: msg.args.clone(),
        }
    }
}

/// Build the outbound frame for a message
pub fn to_transport_frame(message: &Message) -> TransportFrame {
    TransportFrame::from(message)
}

/// Serialize a message as outbound frame JSON text
pub fn to_json(message: &Message) -> Result<String> {
    serde_json::to_string(&to_transport_frame(message)).map_err(|e| Error::Encode(e.to_string()))
}

/// Parse inbound frame JSON text
pub fn parse(text: &str) -> Result<Message> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::frame(format!("invalid JSON: {}", e)))?;
    from_transport_frame(&value)
}

/// Convert an inbound JSON frame into a message.
///
/// `address` must be a non-empty string. `args` may be missing or null (no
/// arguments) but anything other than an array is rejected.
pub fn from_transport_frame(value: &Value) -> Result<Message> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::frame("frame is not a JSON object"))?;

    let address = match obj.get("address") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(Error::frame("empty address")),
        Some(_) => return Err(Error::frame("address is not a string")),
        None => return Err(Error::frame("missing address")),
    };

    let args = match obj.get("args") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(infer_arg).collect(),
        Some(_) => return Err(Error::frame("args is not an array")),
    };

    Ok(Message { address, args })
}

/// Infer the wire type of one inbound JSON argument.
///
/// - whole numbers that fit in i32 become `i`, larger whole numbers `d`
/// - other numbers become `f`
/// - strings stay strings
/// - `{"type", "value"}` objects with a known tag keep that tag
/// - everything else is sent as its textual form
pub fn infer_arg(value: &Value) -> Arg {
    match value {
        Value::Number(n) => infer_number(n),
        Value::String(s) => Arg::String(s.clone()),
        Value::Bool(b) => Arg::String(b.to_string()),
        Value::Null => Arg::String("null".to_string()),
        Value::Object(map) => tagged_arg(map).unwrap_or_else(|| Arg::String(value.to_string())),
        Value::Array(_) => Arg::String(value.to_string()),
    }
}

fn infer_number(n: &Number) -> Arg {
    if let Some(i) = n.as_i64() {
        return i32::try_from(i)
            .map(Arg::Int)
            .unwrap_or(Arg::Double(i as f64));
    }
    if let Some(u) = n.as_u64() {
        return Arg::Double(u as f64);
    }

    let f = n.as_f64().unwrap_or(0.0);
    if f.fract() == 0.0 {
        if f >= i32::MIN as f64 && f <= i32::MAX as f64 {
            Arg::Int(f as i32)
        } else {
            Arg::Double(f)
        }
    } else {
        Arg::Float(f as f32)
    }
}

fn tagged_arg(map: &Map<String, Value>) -> Option<Arg> {
    let tag = map.get("type")?.as_str()?;
    let value = map.get("value")?;

    match tag {
        "i" => {
            if let Some(i) = value.as_i64() {
                i32::try_from(i).ok().map(Arg::Int)
            } else {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
                    .map(|f| Arg::Int(f as i32))
            }
        }
        "f" => value.as_f64().map(|f| Arg::Float(f as f32)),
        "d" => value.as_f64().map(Arg::Double),
        "s" => value.as_str().map(|s| Arg::String(s.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_shape() {
        let msg = Message::new("/x").arg(3).arg(0.5f32).arg("s");
        let value: Value = serde_json::from_str(&to_json(&msg).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "address": "/x",
                "args": [
                    {"type": "i", "value": 3},
                    {"type": "f", "value": 0.5},
                    {"type": "s", "value": "s"}
                ]
            })
        );
    }

    #[test]
    fn test_infer_whole_float_is_int() {
        assert_eq!(infer_arg(&json!(10.0)), Arg::Int(10));
        assert_eq!(infer_arg(&json!(-3)), Arg::Int(-3));
    }

    #[test]
    fn test_infer_large_integer_is_double() {
        assert_eq!(infer_arg(&json!(4_000_000_000u64)), Arg::Double(4_000_000_000.0));
        assert_eq!(infer_arg(&json!(-3_000_000_000i64)), Arg::Double(-3_000_000_000.0));
    }

    #[test]
    fn test_unknown_tag_falls_back_to_text() {
        let arg = infer_arg(&json!({"type": "b", "value": 1}));
        assert!(matches!(arg, Arg::String(_)));
    }
}
