//! Item storage for a single table.
//!
//! ```text
//! DashMap<partition value, BTreeMap<SortKey, Item>>
//! ```
//!
//! Partitions are independent `DashMap` shards; inside a partition items are
//! ordered by sort key. Tables without a sort key store their single item per
//! partition under [`SortKey::Unsorted`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use dynorm_model::AttributeValue;
use dynorm_model::types::ScalarAttributeType;

/// Errors raised while addressing items by key.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A key attribute is absent.
    #[error("One of the required keys was not given a value: {attr}")]
    MissingKeyAttribute {
        /// The name of the missing attribute.
        attr: String,
    },
    /// A key attribute has the wrong type.
    #[error("Type mismatch for key {attr}: expected {expected}, got {actual}")]
    InvalidKeyType {
        /// The name of the attribute.
        attr: String,
        /// The declared scalar type.
        expected: &'static str,
        /// The storage tag that was supplied.
        actual: &'static str,
    },
    /// The key map names attributes that are not part of the key schema.
    #[error("The provided key element does not match the schema")]
    UnexpectedKeyAttribute,
}

/// Key schema of a table in the shape storage needs.
#[derive(Debug, Clone)]
pub struct KeySchema {
    /// Partition (HASH) key.
    pub partition_key: KeyAttribute,
    /// Optional sort (RANGE) key.
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// Returns `true` when `name` is one of the key attributes.
    #[must_use]
    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.partition_key.name == name || self.sort_key.as_ref().is_some_and(|sk| sk.name == name)
    }
}

/// A key attribute name and its scalar type.
#[derive(Debug, Clone)]
pub struct KeyAttribute {
    /// The attribute name.
    pub name: String,
    /// The scalar type.
    pub attr_type: ScalarAttributeType,
}

/// The address of one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// The partition key value.
    pub partition_key: AttributeValue,
    /// The sort key value, for tables that declare one.
    pub sort_key: Option<SortKey>,
}

/// Sort key of an item within its partition.
///
/// Strings order by UTF-8 bytes, numbers numerically, binaries byte-wise.
#[derive(Debug, Clone)]
pub enum SortKey {
    /// String sort key.
    S(String),
    /// Number sort key, kept in its original literal form.
    N(String),
    /// Binary sort key.
    B(bytes::Bytes),
    /// Placeholder used by tables without a sort key.
    Unsorted,
}

impl SortKey {
    fn from_attribute_value(attr: &str, value: &AttributeValue) -> Result<Self, StorageError> {
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Ok(Self::N(n.clone())),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            other => Err(StorageError::InvalidKeyType {
                attr: attr.to_owned(),
                expected: "S, N, or B",
                actual: other.tag(),
            }),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::S(_) => 0,
            Self::N(_) => 1,
            Self::B(_) => 2,
            Self::Unsorted => 3,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => compare_numbers(a, b),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl std::hash::Hash for SortKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::S(s) | Self::N(s) => s.hash(state),
            Self::B(b) => b.hash(state),
            Self::Unsorted => {}
        }
    }
}

/// Compares two number literals numerically.
///
/// Unparseable literals compare equal, which never happens for values that
/// went through the mapping layer.
#[must_use]
pub fn compare_numbers(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(fa), Ok(fb)) => fa.partial_cmp(&fb).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Items of one table.
#[derive(Debug)]
pub struct TableStorage {
    data: DashMap<AttributeValue, BTreeMap<SortKey, HashMap<String, AttributeValue>>>,
    key_schema: KeySchema,
    item_count: AtomicU64,
    total_size: AtomicU64,
}

impl TableStorage {
    /// Creates empty storage for the given key schema.
    #[must_use]
    pub fn new(key_schema: KeySchema) -> Self {
        Self {
            data: DashMap::new(),
            key_schema,
            item_count: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
        }
    }

    /// Returns the key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Returns the current item count.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Returns the approximate size of all items in bytes.
    #[must_use]
    pub fn total_size_bytes(&self) -> u64 {
        self.total_size.load(AtomicOrdering::Relaxed)
    }

    /// Inserts or replaces an item, returning the replaced one.
    pub fn put_item(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> Result<Option<HashMap<String, AttributeValue>>, StorageError> {
        let key = extract_primary_key(&self.key_schema, &item)?;
        let sort_key = key.sort_key.unwrap_or(SortKey::Unsorted);
        let new_size = calculate_item_size(&item);

        let replaced = self
            .data
            .entry(key.partition_key)
            .or_default()
            .insert(sort_key, item);

        self.total_size.fetch_add(new_size, AtomicOrdering::Relaxed);
        match replaced {
            Some(old) => {
                let old_size = calculate_item_size(&old);
                self.total_size.fetch_sub(old_size, AtomicOrdering::Relaxed);
                debug!(old_size, new_size, "replaced existing item");
                Ok(Some(old))
            }
            None => {
                self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
                debug!(new_size, "inserted new item");
                Ok(None)
            }
        }
    }

    /// Retrieves an item by its primary key.
    #[must_use]
    pub fn get_item(&self, key: &PrimaryKey) -> Option<HashMap<String, AttributeValue>> {
        let sort_key = key.sort_key.as_ref().unwrap_or(&SortKey::Unsorted);
        self.data
            .get(&key.partition_key)
            .and_then(|partition| partition.get(sort_key).cloned())
    }

    /// Deletes an item by its primary key, returning it if it existed.
    pub fn delete_item(&self, key: &PrimaryKey) -> Option<HashMap<String, AttributeValue>> {
        let sort_key = key.sort_key.as_ref().unwrap_or(&SortKey::Unsorted);
        let removed = {
            let mut partition = self.data.get_mut(&key.partition_key)?;
            partition.remove(sort_key)?
        };
        self.data
            .remove_if(&key.partition_key, |_, partition| partition.is_empty());

        let size = calculate_item_size(&removed);
        self.item_count.fetch_sub(1, AtomicOrdering::Relaxed);
        self.total_size.fetch_sub(size, AtomicOrdering::Relaxed);
        debug!(size, "deleted item");
        Some(removed)
    }

    /// Returns every item, ordered by partition key then sort key.
    ///
    /// Partitions are ordered by their display form so repeated scans are
    /// deterministic regardless of hashing.
    #[must_use]
    pub fn scan(&self) -> Vec<HashMap<String, AttributeValue>> {
        let mut partitions: Vec<_> = self
            .data
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().clone()))
            .collect();
        partitions.sort_by(|a, b| a.0.cmp(&b.0));

        partitions
            .into_iter()
            .flat_map(|(_, partition)| partition.into_values())
            .collect()
    }
}

/// Extracts the primary key from an item (or a bare key map).
#[allow(clippy::implicit_hasher)]
pub fn extract_primary_key(
    key_schema: &KeySchema,
    item: &HashMap<String, AttributeValue>,
) -> Result<PrimaryKey, StorageError> {
    let pk = &key_schema.partition_key;
    let pk_value = item
        .get(&pk.name)
        .ok_or_else(|| StorageError::MissingKeyAttribute {
            attr: pk.name.clone(),
        })?;
    validate_key_type(&pk.name, pk.attr_type, pk_value)?;

    let sort_key = match &key_schema.sort_key {
        Some(sk) => {
            let sk_value = item
                .get(&sk.name)
                .ok_or_else(|| StorageError::MissingKeyAttribute {
                    attr: sk.name.clone(),
                })?;
            validate_key_type(&sk.name, sk.attr_type, sk_value)?;
            Some(SortKey::from_attribute_value(&sk.name, sk_value)?)
        }
        None => None,
    };

    Ok(PrimaryKey {
        partition_key: pk_value.clone(),
        sort_key,
    })
}

/// Extracts a primary key from a request key map, rejecting extra attributes.
#[allow(clippy::implicit_hasher)]
pub fn extract_request_key(
    key_schema: &KeySchema,
    key: &HashMap<String, AttributeValue>,
) -> Result<PrimaryKey, StorageError> {
    if key.keys().any(|name| !key_schema.is_key_attribute(name)) {
        return Err(StorageError::UnexpectedKeyAttribute);
    }
    extract_primary_key(key_schema, key)
}

fn validate_key_type(
    attr: &str,
    expected: ScalarAttributeType,
    value: &AttributeValue,
) -> Result<(), StorageError> {
    if matches!(
        (expected, value),
        (ScalarAttributeType::S, AttributeValue::S(_))
            | (ScalarAttributeType::N, AttributeValue::N(_))
            | (ScalarAttributeType::B, AttributeValue::B(_))
    ) {
        Ok(())
    } else {
        Err(StorageError::InvalidKeyType {
            attr: attr.to_owned(),
            expected: expected.as_str(),
            actual: value.tag(),
        })
    }
}

/// Approximate item size following DynamoDB's accounting rules: attribute
/// name length plus value size, numbers counted in compact decimal form.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn calculate_item_size(item: &HashMap<String, AttributeValue>) -> u64 {
    item.iter()
        .map(|(name, value)| name.len() as u64 + value_size(value))
        .sum()
}

fn value_size(value: &AttributeValue) -> u64 {
    let number_size = |n: &String| (n.len().div_ceil(2) + 1) as u64;
    match value {
        AttributeValue::S(s) => s.len() as u64,
        AttributeValue::N(n) => number_size(n),
        AttributeValue::B(b) => b.len() as u64,
        AttributeValue::Bool(_) | AttributeValue::Null(_) => 1,
        AttributeValue::Ss(v) => v.iter().map(|s| s.len() as u64).sum(),
        AttributeValue::Ns(v) => v.iter().map(number_size).sum(),
        AttributeValue::Bs(v) => v.iter().map(|b| b.len() as u64).sum(),
        AttributeValue::L(list) => 3 + list.iter().map(|e| 1 + value_size(e)).sum::<u64>(),
        AttributeValue::M(map) => {
            3 + map
                .iter()
                .map(|(k, v)| k.len() as u64 + 1 + value_size(v))
                .sum::<u64>()
        }
    }
}
