//! Conversion between in-memory attribute values and the tagged store form.
//!
//! Writing is driven by the declared [`AttributeType`]; reading unwraps
//! whatever tag the store returned.

use serde_json::{Map, Number, Value};

use dynorm_model::AttributeValue;
use dynorm_model::attribute_value::{decode_binary, encode_binary};

use crate::attribute::AttributeType;
use crate::error::{DynormError, DynormResult};

/// Encode `value` as `attribute_type` for the attribute called `name`.
pub fn to_attribute_value(
    name: &str,
    attribute_type: AttributeType,
    value: &Value,
) -> DynormResult<AttributeValue> {
    let fail = |reason: &str| DynormError::Marshal {
        attribute: name.to_owned(),
        attribute_type: attribute_type.tag(),
        reason: reason.to_owned(),
    };

    match attribute_type {
        AttributeType::String => value
            .as_str()
            .map(|s| AttributeValue::S(s.to_owned()))
            .ok_or_else(|| fail("not a string")),
        AttributeType::Number => number_string(value)
            .map(AttributeValue::N)
            .ok_or_else(|| fail("not a number")),
        AttributeType::Binary => value
            .as_str()
            .and_then(|s| decode_binary(s).ok())
            .map(AttributeValue::B)
            .ok_or_else(|| fail("expected a base64 string")),
        AttributeType::Boolean => value
            .as_bool()
            .map(AttributeValue::Bool)
            .ok_or_else(|| fail("not a boolean")),
        AttributeType::Null => Ok(AttributeValue::Null(true)),
        AttributeType::Map => match value {
            Value::Object(map) => Ok(AttributeValue::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), infer_attribute_value(v)))
                    .collect(),
            )),
            _ => Err(fail("not an object")),
        },
        AttributeType::List => match value {
            Value::Array(items) => Ok(AttributeValue::L(
                items.iter().map(infer_attribute_value).collect(),
            )),
            _ => Err(fail("not an array")),
        },
        AttributeType::StringSet => elements(value, |v| v.as_str().map(ToOwned::to_owned))
            .map(AttributeValue::Ss)
            .ok_or_else(|| fail("expected an array of strings")),
        AttributeType::NumberSet => elements(value, number_string)
            .map(AttributeValue::Ns)
            .ok_or_else(|| fail("expected an array of numbers")),
        AttributeType::BinarySet => {
            elements(value, |v| v.as_str().and_then(|s| decode_binary(s).ok()))
                .map(AttributeValue::Bs)
                .ok_or_else(|| fail("expected an array of base64 strings"))
        }
    }
}

fn elements<T>(value: &Value, convert: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(convert).collect()
}

fn number_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.trim().parse::<f64>().is_ok() => Some(s.trim().to_owned()),
        _ => None,
    }
}

/// Encode an undeclared value (map entries, list elements) by its JSON shape.
#[must_use]
pub fn infer_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(infer_attribute_value).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), infer_attribute_value(v)))
                .collect(),
        ),
    }
}

/// Unwrap a stored value.
///
/// Numbers become JSON numbers when they fit, binaries become base64 strings.
#[must_use]
pub fn from_attribute_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::B(b) => Value::String(encode_binary(b)),
        AttributeValue::Ss(ss) => Value::Array(ss.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(ns) => Value::Array(ns.iter().map(|n| parse_number(n)).collect()),
        AttributeValue::Bs(bs) => Value::Array(
            bs.iter()
                .map(|b| Value::String(encode_binary(b)))
                .collect(),
        ),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute_value).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute_value(v)))
                .collect::<Map<_, _>>(),
        ),
    }
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(u) = n.parse::<u64>() {
        return Value::from(u);
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(n.to_owned()), Value::Number)
}
