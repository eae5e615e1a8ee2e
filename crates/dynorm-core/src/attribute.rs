//! Attribute types and the attribute validator.
//!
//! Every declared attribute carries an [`AttributeType`]. The type decides
//! two things: which runtime values are acceptable ([`validate`]) and which
//! DynamoDB storage tag the value is written under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dynorm_model::types::ScalarAttributeType;

/// The closed set of attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributeType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`, base64 encoded in memory.
    Binary,
    /// `BOOL`
    Boolean,
    /// `NULL`
    Null,
    /// `M`
    Map,
    /// `L`
    List,
    /// `SS`
    StringSet,
    /// `NS`
    NumberSet,
    /// `BS`
    BinarySet,
}

impl AttributeType {
    /// Every attribute type, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::String,
        Self::Number,
        Self::Binary,
        Self::Boolean,
        Self::Null,
        Self::Map,
        Self::List,
        Self::StringSet,
        Self::NumberSet,
        Self::BinarySet,
    ];

    /// The DynamoDB storage tag.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
            Self::Boolean => "BOOL",
            Self::Null => "NULL",
            Self::Map => "M",
            Self::List => "L",
            Self::StringSet => "SS",
            Self::NumberSet => "NS",
            Self::BinarySet => "BS",
        }
    }

    /// The type name used in declarations.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Binary => "Binary",
            Self::Boolean => "Boolean",
            Self::Null => "Null",
            Self::Map => "Map",
            Self::List => "List",
            Self::StringSet => "StringSet",
            Self::NumberSet => "NumberSet",
            Self::BinarySet => "BinarySet",
        }
    }

    /// Parse a storage tag, ignoring case. `BB` is accepted for booleans.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("BB") {
            return Some(Self::Boolean);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.tag().eq_ignore_ascii_case(tag))
    }

    /// The key attribute type, for types that may form a primary key.
    #[must_use]
    pub fn scalar_type(self) -> Option<ScalarAttributeType> {
        match self {
            Self::String => Some(ScalarAttributeType::S),
            Self::Number => Some(ScalarAttributeType::N),
            Self::Binary => Some(ScalarAttributeType::B),
            _ => None,
        }
    }

    /// What a value of this type looks like, as reported in type errors.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Map => "object",
            Self::List => "array",
            Self::StringSet => "string set",
            Self::NumberSet => "number set",
            Self::BinarySet => "binary set",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a type name or tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attribute type \"{0}\"")]
pub struct ParseAttributeTypeError(pub String);

impl FromStr for AttributeType {
    type Err = ParseAttributeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
            .or_else(|| Self::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(s)))
            .ok_or_else(|| ParseAttributeTypeError(s.to_owned()))
    }
}

impl TryFrom<String> for AttributeType {
    type Error = ParseAttributeTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeType> for String {
    fn from(value: AttributeType) -> Self {
        value.tag().to_owned()
    }
}

/// Declaration of one attribute: its type, whether it is required, and the
/// current (or default) value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    /// Declared type.
    pub attribute_type: AttributeType,
    /// Whether `validate` reports the attribute when unset.
    pub required: bool,
    /// Default value on an entity, current value on a model.
    pub value: Option<Value>,
}

impl AttributeDefinition {
    /// An optional attribute with no default.
    #[must_use]
    pub fn new(attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            required: false,
            value: None,
        }
    }

    /// Mark the attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Check a value against this attribute's type.
    pub fn validate(&self, value: &Value) -> Result<(), TypeMismatch> {
        validate(self.attribute_type, value)
    }
}

/// A value did not match its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{expected}")]
pub struct TypeMismatch {
    /// Description of the expected type, e.g. `"string set"`.
    pub expected: &'static str,
}

/// Raised by [`Model::set_validated`](crate::Model::set_validated) when the
/// value does not fit the attribute.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{attribute} must be a {expected} on {model}")]
pub struct AttributeTypeError {
    /// Attribute being assigned.
    pub attribute: String,
    /// Description of the expected type.
    pub expected: &'static str,
    /// Name of the owning model.
    pub model: String,
}

/// Validate `value` against `attribute_type`.
///
/// Binary, binary set and null attributes accept any value.
pub fn validate(attribute_type: AttributeType, value: &Value) -> Result<(), TypeMismatch> {
    let valid = match attribute_type {
        AttributeType::String => value.is_string(),
        AttributeType::Number => value.is_number(),
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Map => value.is_object(),
        AttributeType::StringSet => every_element(value, Value::is_string),
        AttributeType::NumberSet => every_element(value, Value::is_number),
        AttributeType::List => {
            if !value.is_array() {
                return Err(TypeMismatch { expected: "array" });
            }
            if !every_element(value, |v| v.is_string() || v.is_number()) {
                return Err(TypeMismatch {
                    expected: "primitive",
                });
            }
            true
        }
        AttributeType::Binary | AttributeType::BinarySet | AttributeType::Null => true,
    };

    if valid {
        Ok(())
    } else {
        Err(TypeMismatch {
            expected: attribute_type.description(),
        })
    }
}

fn every_element(value: &Value, predicate: impl Fn(&Value) -> bool) -> bool {
    value.as_array().is_some_and(|items| items.iter().all(predicate))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_parse_tags_and_names() {
        assert_eq!("s".parse::<AttributeType>().unwrap(), AttributeType::String);
        assert_eq!("SS".parse::<AttributeType>().unwrap(), AttributeType::StringSet);
        assert_eq!("bool".parse::<AttributeType>().unwrap(), AttributeType::Boolean);
        assert_eq!("BB".parse::<AttributeType>().unwrap(), AttributeType::Boolean);
        assert_eq!("NumberSet".parse::<AttributeType>().unwrap(), AttributeType::NumberSet);
        assert!("Decimal".parse::<AttributeType>().is_err());
    }

    #[test]
    fn test_should_serialize_as_storage_tag() {
        let encoded = serde_json::to_string(&AttributeType::Boolean).unwrap();
        assert_eq!(encoded, "\"BOOL\"");
        let decoded: AttributeType = serde_json::from_str("\"map\"").unwrap();
        assert_eq!(decoded, AttributeType::Map);
    }

    #[test]
    fn test_should_validate_scalars() {
        assert!(validate(AttributeType::String, &json!("Southern Cooking")).is_ok());
        assert_eq!(
            validate(AttributeType::String, &json!([])),
            Err(TypeMismatch { expected: "string" })
        );
        assert!(validate(AttributeType::Number, &json!(70)).is_ok());
        assert_eq!(
            validate(AttributeType::Number, &json!("70")),
            Err(TypeMismatch { expected: "number" })
        );
        assert!(validate(AttributeType::Boolean, &json!(true)).is_ok());
        assert!(validate(AttributeType::Boolean, &json!(1)).is_err());
    }

    #[test]
    fn test_should_validate_sets() {
        assert!(validate(AttributeType::StringSet, &json!(["http://pathtoimage.com"])).is_ok());
        assert_eq!(
            validate(AttributeType::StringSet, &json!("http://pathtoimage.com")),
            Err(TypeMismatch {
                expected: "string set"
            })
        );
        assert!(validate(AttributeType::NumberSet, &json!([1, 2.5])).is_ok());
        assert!(validate(AttributeType::NumberSet, &json!(["70"])).is_err());
    }

    #[test]
    fn test_should_validate_maps_and_lists() {
        assert!(validate(AttributeType::Map, &json!({"a": 1})).is_ok());
        assert_eq!(
            validate(AttributeType::Map, &json!(null)),
            Err(TypeMismatch { expected: "object" })
        );
        assert!(validate(AttributeType::List, &json!(["a", 1])).is_ok());
        assert_eq!(
            validate(AttributeType::List, &json!("a")),
            Err(TypeMismatch { expected: "array" })
        );
        assert_eq!(
            validate(AttributeType::List, &json!([true])),
            Err(TypeMismatch {
                expected: "primitive"
            })
        );
        assert!(validate(AttributeType::List, &json!([["nested"]])).is_err());
    }

    // Binary, binary set and null carry no shape check.
    #[test]
    fn test_should_accept_anything_for_unchecked_types() {
        for attribute_type in [
            AttributeType::Binary,
            AttributeType::BinarySet,
            AttributeType::Null,
        ] {
            assert!(validate(attribute_type, &json!(42)).is_ok());
            assert!(validate(attribute_type, &json!({"x": []})).is_ok());
        }
    }

    #[test]
    fn test_should_format_attribute_type_error() {
        let err = AttributeTypeError {
            attribute: "reviews".to_owned(),
            expected: "number",
            model: "CookbookModel".to_owned(),
        };
        assert_eq!(err.to_string(), "reviews must be a number on CookbookModel");
    }
}
