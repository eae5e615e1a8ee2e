//! Conversions between dynorm wire types and SDK types.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types as sdk;
use bytes::Bytes;

use dynorm_model::AttributeValue;
use dynorm_model::error::DynamoDBError;
use dynorm_model::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput,
    ProvisionedThroughputDescription, ReturnValue, ScalarAttributeType, TableDescription,
    TableStatus,
};

/// Convert an attribute value into its SDK form.
#[must_use]
pub fn to_sdk_value(value: AttributeValue) -> sdk::AttributeValue {
    match value {
        AttributeValue::S(s) => sdk::AttributeValue::S(s),
        AttributeValue::N(n) => sdk::AttributeValue::N(n),
        AttributeValue::B(b) => sdk::AttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(ss) => sdk::AttributeValue::Ss(ss),
        AttributeValue::Ns(ns) => sdk::AttributeValue::Ns(ns),
        AttributeValue::Bs(bs) => {
            sdk::AttributeValue::Bs(bs.into_iter().map(|b| Blob::new(b.to_vec())).collect())
        }
        AttributeValue::Bool(b) => sdk::AttributeValue::Bool(b),
        AttributeValue::Null(n) => sdk::AttributeValue::Null(n),
        AttributeValue::L(l) => sdk::AttributeValue::L(l.into_iter().map(to_sdk_value).collect()),
        AttributeValue::M(m) => sdk::AttributeValue::M(to_sdk_item(m)),
    }
}

/// Convert an SDK attribute value back.
///
/// Fails on variants this SDK version does not know how to name.
pub fn from_sdk_value(value: sdk::AttributeValue) -> Result<AttributeValue, DynamoDBError> {
    Ok(match value {
        sdk::AttributeValue::S(s) => AttributeValue::S(s),
        sdk::AttributeValue::N(n) => AttributeValue::N(n),
        sdk::AttributeValue::B(b) => AttributeValue::B(Bytes::from(b.into_inner())),
        sdk::AttributeValue::Ss(ss) => AttributeValue::Ss(ss),
        sdk::AttributeValue::Ns(ns) => AttributeValue::Ns(ns),
        sdk::AttributeValue::Bs(bs) => AttributeValue::Bs(
            bs.into_iter()
                .map(|b| Bytes::from(b.into_inner()))
                .collect(),
        ),
        sdk::AttributeValue::Bool(b) => AttributeValue::Bool(b),
        sdk::AttributeValue::Null(n) => AttributeValue::Null(n),
        sdk::AttributeValue::L(l) => AttributeValue::L(
            l.into_iter()
                .map(from_sdk_value)
                .collect::<Result<_, _>>()?,
        ),
        sdk::AttributeValue::M(m) => AttributeValue::M(from_sdk_item(m)?),
        other => {
            return Err(DynamoDBError::validation(format!(
                "unsupported attribute value from service: {other:?}"
            )));
        }
    })
}

/// Convert an item into its SDK form.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn to_sdk_item(item: HashMap<String, AttributeValue>) -> HashMap<String, sdk::AttributeValue> {
    item.into_iter().map(|(k, v)| (k, to_sdk_value(v))).collect()
}

/// Convert an SDK item back.
#[allow(clippy::implicit_hasher)]
pub fn from_sdk_item(
    item: HashMap<String, sdk::AttributeValue>,
) -> Result<HashMap<String, AttributeValue>, DynamoDBError> {
    item.into_iter()
        .map(|(k, v)| from_sdk_value(v).map(|v| (k, v)))
        .collect()
}

/// Convert a key schema element.
pub fn to_sdk_key_schema_element(
    element: &KeySchemaElement,
) -> Result<sdk::KeySchemaElement, DynamoDBError> {
    sdk::KeySchemaElement::builder()
        .attribute_name(&element.attribute_name)
        .key_type(match element.key_type {
            KeyType::Hash => sdk::KeyType::Hash,
            KeyType::Range => sdk::KeyType::Range,
        })
        .build()
        .map_err(|e| DynamoDBError::validation(e.to_string()))
}

/// Convert an attribute definition.
pub fn to_sdk_attribute_definition(
    definition: &AttributeDefinition,
) -> Result<sdk::AttributeDefinition, DynamoDBError> {
    sdk::AttributeDefinition::builder()
        .attribute_name(&definition.attribute_name)
        .attribute_type(to_sdk_scalar_type(definition.attribute_type))
        .build()
        .map_err(|e| DynamoDBError::validation(e.to_string()))
}

/// Convert provisioned throughput settings.
pub fn to_sdk_throughput(
    throughput: ProvisionedThroughput,
) -> Result<sdk::ProvisionedThroughput, DynamoDBError> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()
        .map_err(|e| DynamoDBError::validation(e.to_string()))
}

fn to_sdk_scalar_type(value: ScalarAttributeType) -> sdk::ScalarAttributeType {
    match value {
        ScalarAttributeType::S => sdk::ScalarAttributeType::S,
        ScalarAttributeType::N => sdk::ScalarAttributeType::N,
        ScalarAttributeType::B => sdk::ScalarAttributeType::B,
    }
}

/// Convert a billing mode.
#[must_use]
pub fn to_sdk_billing_mode(value: BillingMode) -> sdk::BillingMode {
    match value {
        BillingMode::Provisioned => sdk::BillingMode::Provisioned,
        BillingMode::PayPerRequest => sdk::BillingMode::PayPerRequest,
    }
}

/// Convert a return-values setting.
#[must_use]
pub fn to_sdk_return_value(value: ReturnValue) -> sdk::ReturnValue {
    match value {
        ReturnValue::None => sdk::ReturnValue::None,
        ReturnValue::AllOld => sdk::ReturnValue::AllOld,
        ReturnValue::AllNew => sdk::ReturnValue::AllNew,
    }
}

/// Convert an SDK table description.
///
/// Key attributes with types this crate does not model are dropped.
#[must_use]
pub fn from_sdk_table_description(desc: &sdk::TableDescription) -> TableDescription {
    TableDescription {
        table_name: desc.table_name().map(ToOwned::to_owned),
        table_status: desc
            .table_status()
            .and_then(|s| TableStatus::from_wire(s.as_str())),
        key_schema: desc
            .key_schema()
            .iter()
            .filter_map(|e| {
                let key_type = match e.key_type() {
                    sdk::KeyType::Hash => KeyType::Hash,
                    sdk::KeyType::Range => KeyType::Range,
                    _ => return None,
                };
                Some(KeySchemaElement::new(e.attribute_name(), key_type))
            })
            .collect(),
        attribute_definitions: desc
            .attribute_definitions()
            .iter()
            .filter_map(|d| {
                ScalarAttributeType::from_wire(d.attribute_type().as_str())
                    .map(|t| AttributeDefinition::new(d.attribute_name(), t))
            })
            .collect(),
        creation_date_time: desc.creation_date_time().map(|t| t.as_secs_f64()),
        item_count: desc.item_count(),
        table_size_bytes: desc.table_size_bytes(),
        table_arn: desc.table_arn().map(ToOwned::to_owned),
        table_id: desc.table_id().map(ToOwned::to_owned),
        provisioned_throughput: desc.provisioned_throughput().map(|pt| {
            ProvisionedThroughputDescription {
                read_capacity_units: pt.read_capacity_units().unwrap_or_default(),
                write_capacity_units: pt.write_capacity_units().unwrap_or_default(),
            }
        }),
    }
}
