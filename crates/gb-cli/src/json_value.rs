use std::collections::BTreeMap;

use gb_core::{BridgeError, GuestValue};
use serde_json::{Number, Value};

pub(crate) fn json_to_guest(value: Value) -> Result<GuestValue, BridgeError> {
    Ok(match value {
        Value::Null => GuestValue::Unit,
        Value::Bool(value) => GuestValue::Bool(value),
        Value::Number(number) => number_to_guest(&number)?,
        Value::String(value) => GuestValue::Str(value),
        Value::Array(values) => GuestValue::Seq(
            values
                .into_iter()
                .map(json_to_guest)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(entries) => {
            let mut map = BTreeMap::new();
            for (key, value) in entries {
                map.insert(key, json_to_guest(value)?);
            }
            GuestValue::Map(map)
        }
    })
}

fn number_to_guest(number: &Number) -> Result<GuestValue, BridgeError> {
    if let Some(value) = number.as_i64() {
        return Ok(GuestValue::Int(value));
    }
    if number.is_u64() {
        return Err(BridgeError::conversion(
            "number",
            format!("{} does not fit a 64-bit signed integer", number),
        ));
    }
    number
        .as_f64()
        .map(GuestValue::Float)
        .ok_or_else(|| BridgeError::conversion("number", number.to_string()))
}

pub(crate) fn guest_to_json(value: &GuestValue) -> Result<Value, BridgeError> {
    Ok(match value {
        GuestValue::Unit => Value::Null,
        GuestValue::Bool(value) => Value::Bool(*value),
        GuestValue::Int(value) => Value::from(*value),
        GuestValue::Float(value) => Number::from_f64(*value)
            .map(Value::Number)
            .ok_or_else(|| BridgeError::conversion("float", format!("{} is not finite", value)))?,
        GuestValue::Str(value) => Value::String(value.clone()),
        GuestValue::Seq(values) => Value::Array(
            values
                .iter()
                .map(guest_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        GuestValue::Map(entries) => {
            let mut map = serde_json::Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), guest_to_json(value)?);
            }
            Value::Object(map)
        }
        GuestValue::Object(object) => {
            return Err(BridgeError::conversion(
                object.type_name(),
                "host objects have no JSON form",
            ))
        }
    })
}
