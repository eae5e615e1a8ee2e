//! Table registry of the memory store.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use dynorm_model::error::DynamoDBError;
use dynorm_model::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, ProvisionedThroughput,
    ProvisionedThroughputDescription, TableDescription, TableStatus,
};

use crate::storage::{KeySchema, TableStorage};

/// Every table held by one memory store.
#[derive(Debug, Default)]
pub struct MemoryState {
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl MemoryState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<Arc<MemoryTable>> {
        self.tables.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Get a table or fail with `ResourceNotFoundException`.
    pub fn require_table(&self, name: &str) -> Result<Arc<MemoryTable>, DynamoDBError> {
        self.get_table(name).ok_or_else(|| not_found(name))
    }

    /// Insert a new table, failing with `ResourceInUseException` if the name
    /// is taken.
    pub fn create_table(&self, table: MemoryTable) -> Result<Arc<MemoryTable>, DynamoDBError> {
        match self.tables.entry(table.name.clone()) {
            Entry::Occupied(e) => Err(DynamoDBError::resource_in_use(format!(
                "Table already exists: {}",
                e.key()
            ))),
            Entry::Vacant(e) => {
                let table = Arc::new(table);
                e.insert(Arc::clone(&table));
                Ok(table)
            }
        }
    }

    /// Remove a table by name.
    pub fn delete_table(&self, name: &str) -> Result<Arc<MemoryTable>, DynamoDBError> {
        self.tables
            .remove(name)
            .map(|(_, t)| t)
            .ok_or_else(|| not_found(name))
    }

    /// All table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Drop every table.
    pub fn reset(&self) {
        self.tables.clear();
    }
}

fn not_found(name: &str) -> DynamoDBError {
    DynamoDBError::resource_not_found(format!(
        "Requested resource not found: Table: {name} not found"
    ))
}

/// One table: metadata plus items.
#[derive(Debug)]
pub struct MemoryTable {
    /// Table name.
    pub name: String,
    /// Key schema elements as supplied at creation.
    pub key_schema_elements: Vec<KeySchemaElement>,
    /// Key attribute definitions as supplied at creation.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Billing mode.
    pub billing_mode: BillingMode,
    /// Provisioned throughput (recorded, not enforced).
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Table ARN.
    pub arn: String,
    /// Stable table id assigned at creation.
    pub table_id: String,
    /// Creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Items.
    pub storage: TableStorage,
}

impl MemoryTable {
    /// Parsed key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        self.storage.key_schema()
    }

    /// Describe this table with the given status.
    #[must_use]
    pub fn to_description(&self, status: TableStatus) -> TableDescription {
        #[allow(clippy::cast_precision_loss)] // epoch seconds are reported as f64
        let creation_time = self.created_at.timestamp() as f64;
        TableDescription {
            table_name: Some(self.name.clone()),
            table_status: Some(status),
            key_schema: self.key_schema_elements.clone(),
            attribute_definitions: self.attribute_definitions.clone(),
            creation_date_time: Some(creation_time),
            item_count: Some(i64::try_from(self.storage.item_count()).unwrap_or(i64::MAX)),
            table_size_bytes: Some(
                i64::try_from(self.storage.total_size_bytes()).unwrap_or(i64::MAX),
            ),
            table_arn: Some(self.arn.clone()),
            table_id: Some(self.table_id.clone()),
            provisioned_throughput: Some(
                self.provisioned_throughput
                    .map(|pt| ProvisionedThroughputDescription {
                        read_capacity_units: pt.read_capacity_units,
                        write_capacity_units: pt.write_capacity_units,
                    })
                    .unwrap_or_default(),
            ),
        }
    }
}
