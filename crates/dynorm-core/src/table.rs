//! Table schema descriptors and the table lifecycle handle.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use dynorm_model::error::DynamoDBErrorCode;
use dynorm_model::input::{CreateTableInput, DeleteTableInput, DescribeTableInput};
use dynorm_model::types::{
    AttributeDefinition as KeyAttributeDefinition, KeySchemaElement, KeyType,
    ProvisionedThroughput, ScalarAttributeType, TableDescription,
};
use dynorm_model::{Item, SharedClient};

use crate::attribute::AttributeType;
use crate::entity::Entity;
use crate::error::{DynormError, DynormResult};
use crate::marshal::to_attribute_value;

/// Read and write capacity requested for every created table.
pub const DEFAULT_CAPACITY_UNITS: i64 = 1;

/// Which attributes form the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Partition key attribute.
    pub pk: String,
    /// Sort key attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk: Option<String>,
}

impl PrimaryKey {
    /// A partition key only.
    #[must_use]
    pub fn new(pk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: None,
        }
    }

    /// A partition key and a sort key.
    #[must_use]
    pub fn composite(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: Some(sk.into()),
        }
    }
}

/// Values for the key attributes of one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues {
    /// Partition key value.
    pub pk: Option<Value>,
    /// Sort key value.
    pub sk: Option<Value>,
}

impl KeyValues {
    /// A partition key value.
    #[must_use]
    pub fn new(pk: impl Into<Value>) -> Self {
        Self {
            pk: Some(pk.into()),
            sk: None,
        }
    }

    /// Add the sort key value.
    #[must_use]
    pub fn with_sort_key(mut self, sk: impl Into<Value>) -> Self {
        self.sk = Some(sk.into());
        self
    }
}

/// Name and storage type of one key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// Attribute name.
    pub attribute_name: String,
    /// Storage type.
    pub attribute_type: ScalarAttributeType,
}

/// Partition and sort key attributes with their storage types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyDefinition {
    /// Partition key.
    pub pk: KeyInput,
    /// Sort key.
    pub sk: Option<KeyInput>,
}

/// What [`Table::create`] does when the table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExistenceOption {
    /// Fail with [`DynormError::CreateTable`].
    #[default]
    None,
    /// Leave the existing table alone.
    IfNotExists,
    /// Delete the existing table, then create it.
    DropIfExists,
}

impl ExistenceOption {
    /// The declaration form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::IfNotExists => "IF_NOT_EXISTS",
            Self::DropIfExists => "DROP_IF_EXISTS",
        }
    }
}

impl fmt::Display for ExistenceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExistenceOption {
    type Err = DynormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "IF_NOT_EXISTS" => Ok(Self::IfNotExists),
            "DROP_IF_EXISTS" => Ok(Self::DropIfExists),
            _ => Err(DynormError::Config(format!("unknown existence option \"{s}\""))),
        }
    }
}

/// A physical table bound to one entity and a primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    alias: Option<String>,
    primary_key: PrimaryKey,
    entity: Arc<Entity>,
}

impl TableSchema {
    /// Describe a table. Key attributes are checked against the entity when
    /// key definitions are derived; the registry does so at build time.
    #[must_use]
    pub fn new(name: impl Into<String>, primary_key: PrimaryKey, entity: Entity) -> Self {
        Self {
            name: name.into(),
            alias: None,
            primary_key,
            entity: Arc::new(entity),
        }
    }

    /// Also answer to `alias` in registry lookups.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Physical table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical alias.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Whether `name` is this table's name or alias.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.alias.as_deref() == Some(name)
    }

    /// Declared primary key.
    #[must_use]
    pub fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    /// Whether the key includes a sort key.
    #[must_use]
    pub fn has_sort_key(&self) -> bool {
        self.primary_key.sk.is_some()
    }

    /// The bound entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Store attribute definitions for the key attributes, partition key first.
    ///
    /// # Errors
    ///
    /// [`DynormError::Config`] when a key attribute is not declared on the
    /// entity or its type cannot be a key.
    pub fn to_attribute_definitions(&self) -> DynormResult<Vec<KeyAttributeDefinition>> {
        let definition = self.primary_key_definition()?;
        Ok(std::iter::once(definition.pk)
            .chain(definition.sk)
            .map(|k| KeyAttributeDefinition::new(k.attribute_name, k.attribute_type))
            .collect())
    }

    /// Key roles paired with their storage types.
    ///
    /// # Errors
    ///
    /// Same as [`Self::to_attribute_definitions`].
    pub fn primary_key_definition(&self) -> DynormResult<PrimaryKeyDefinition> {
        Ok(PrimaryKeyDefinition {
            pk: self.key_input("Partition", &self.primary_key.pk)?,
            sk: self
                .primary_key
                .sk
                .as_deref()
                .map(|sk| self.key_input("Sort", sk))
                .transpose()?,
        })
    }

    fn key_input(&self, role: &str, attribute: &str) -> DynormResult<KeyInput> {
        let definition = self.entity.attribute(attribute).ok_or_else(|| {
            DynormError::Config(format!(
                "{role} key \"{attribute}\" is not defined in {}",
                self.entity.name()
            ))
        })?;
        let attribute_type = definition.attribute_type.scalar_type().ok_or_else(|| {
            DynormError::Config(format!(
                "{role} key \"{attribute}\" must be a string, number or binary attribute, \
                 found {}",
                definition.attribute_type.name()
            ))
        })?;
        Ok(KeyInput {
            attribute_name: attribute.to_owned(),
            attribute_type,
        })
    }

    /// The create-table request for this table.
    ///
    /// # Errors
    ///
    /// Same as [`Self::to_attribute_definitions`].
    pub fn to_create_table_input(&self) -> DynormResult<CreateTableInput> {
        let definition = self.primary_key_definition()?;
        let key_schema = std::iter::once(KeySchemaElement::new(
            &definition.pk.attribute_name,
            KeyType::Hash,
        ))
        .chain(
            definition
                .sk
                .as_ref()
                .map(|sk| KeySchemaElement::new(&sk.attribute_name, KeyType::Range)),
        )
        .collect();

        Ok(CreateTableInput {
            table_name: self.name.clone(),
            key_schema,
            attribute_definitions: self.to_attribute_definitions()?,
            billing_mode: None,
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: DEFAULT_CAPACITY_UNITS,
                write_capacity_units: DEFAULT_CAPACITY_UNITS,
            }),
        })
    }

    /// The item key for `key`.
    ///
    /// # Errors
    ///
    /// [`DynormError::PrimaryKey`] when the partition key value is missing, or
    /// a sort key value is supplied for a table without a sort key.
    pub fn to_input_key(&self, key: &KeyValues) -> DynormResult<Item> {
        let definition = self.primary_key_definition()?;
        let pk = key.pk.as_ref().ok_or_else(|| {
            DynormError::PrimaryKey(format!(
                "Partition key \"{}\" requires a value on {}",
                definition.pk.attribute_name, self.name
            ))
        })?;

        let mut item = Item::new();
        item.insert(
            definition.pk.attribute_name.clone(),
            to_attribute_value(
                &definition.pk.attribute_name,
                key_attribute_type(definition.pk.attribute_type),
                pk,
            )?,
        );

        if let Some(sk) = &key.sk {
            let sk_definition = definition.sk.as_ref().ok_or_else(|| {
                DynormError::PrimaryKey(format!(
                    "Sort key value supplied but no sort key is defined on {}",
                    self.name
                ))
            })?;
            item.insert(
                sk_definition.attribute_name.clone(),
                to_attribute_value(
                    &sk_definition.attribute_name,
                    key_attribute_type(sk_definition.attribute_type),
                    sk,
                )?,
            );
        }

        Ok(item)
    }
}

fn key_attribute_type(scalar: ScalarAttributeType) -> AttributeType {
    match scalar {
        ScalarAttributeType::S => AttributeType::String,
        ScalarAttributeType::N => AttributeType::Number,
        ScalarAttributeType::B => AttributeType::Binary,
    }
}

/// A table schema bound to a store client.
#[derive(Debug, Clone)]
pub struct Table {
    schema: Arc<TableSchema>,
    client: SharedClient,
}

impl Table {
    /// Bind a schema to a client.
    #[must_use]
    pub fn new(schema: Arc<TableSchema>, client: SharedClient) -> Self {
        Self { schema, client }
    }

    /// The schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Create the table.
    ///
    /// Returns the new table's description. With
    /// [`ExistenceOption::IfNotExists`] an existing table is described instead.
    ///
    /// # Errors
    ///
    /// [`DynormError::CreateTable`] when the table exists and `option` is
    /// [`ExistenceOption::None`]; [`DynormError::Store`] for other failures.
    pub async fn create(&self, option: ExistenceOption) -> DynormResult<Option<TableDescription>> {
        let name = self.schema.name();
        match option {
            ExistenceOption::None => {}
            ExistenceOption::IfNotExists => {
                if let Some(existing) = self.describe().await? {
                    debug!(table = %name, "table exists, skipping create");
                    return Ok(Some(existing));
                }
            }
            ExistenceOption::DropIfExists => {
                if self.delete().await?.is_some() {
                    info!(table = %name, "dropped existing table");
                }
            }
        }

        let input = self.schema.to_create_table_input()?;
        match self.client.create_table(input).await {
            Ok(output) => {
                info!(table = %name, "created table");
                Ok(output.table_description)
            }
            Err(e) if e.is_resource_in_use() => Err(DynormError::CreateTable(format!(
                "Table already exists \"{name}\""
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Describe the table, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`DynormError::Store`] for any failure other than a missing table.
    pub async fn describe(&self) -> DynormResult<Option<TableDescription>> {
        let input = DescribeTableInput {
            table_name: self.schema.name().to_owned(),
        };
        match self.client.describe_table(input).await {
            Ok(output) => Ok(output.table),
            Err(e) if e.code == DynamoDBErrorCode::ResourceNotFoundException => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the table exists.
    ///
    /// # Errors
    ///
    /// Same as [`Self::describe`].
    pub async fn exists(&self) -> DynormResult<bool> {
        Ok(self.describe().await?.is_some())
    }

    /// Delete the table. Returns `None` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// [`DynormError::Store`] for any failure other than a missing table.
    pub async fn delete(&self) -> DynormResult<Option<TableDescription>> {
        let input = DeleteTableInput {
            table_name: self.schema.name().to_owned(),
        };
        match self.client.delete_table(input).await {
            Ok(output) => {
                info!(table = %self.schema.name(), "deleted table");
                Ok(output.table_description)
            }
            Err(e) if e.code == DynamoDBErrorCode::ResourceNotFoundException => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use dynorm_model::AttributeValue;

    use super::*;
    use crate::test_support::{
        FailingClient, authors_table, cookbooks_table, memory_client, recipes_table,
    };

    #[test]
    fn test_should_derive_key_attribute_definitions() {
        let definitions = cookbooks_table().to_attribute_definitions().unwrap();
        assert_eq!(
            definitions,
            vec![
                KeyAttributeDefinition::new("title", ScalarAttributeType::S),
                KeyAttributeDefinition::new("author", ScalarAttributeType::S),
            ]
        );
    }

    #[test]
    fn test_should_fail_when_key_attribute_is_undeclared() {
        let err = recipes_table().to_attribute_definitions().unwrap_err();
        assert!(matches!(
            err,
            DynormError::Config(ref m) if m == "Partition key \"id\" is not defined in RecipeEntity"
        ));
    }

    #[test]
    fn test_should_build_create_table_input() {
        let input = cookbooks_table().to_create_table_input().unwrap();
        assert_eq!(input.table_name, "Cookbooks");
        assert_eq!(
            input.key_schema,
            vec![
                KeySchemaElement::new("title", KeyType::Hash),
                KeySchemaElement::new("author", KeyType::Range),
            ]
        );
        assert_eq!(input.attribute_definitions.len(), 2);
        assert_eq!(
            input.provisioned_throughput,
            Some(ProvisionedThroughput {
                read_capacity_units: 1,
                write_capacity_units: 1,
            })
        );
    }

    #[test]
    fn test_should_build_input_key() {
        let key = cookbooks_table()
            .to_input_key(&KeyValues::new("Bay Breeze").with_sort_key("amy@example.com"))
            .unwrap();
        assert_eq!(key["title"], AttributeValue::S("Bay Breeze".to_owned()));
        assert_eq!(key["author"], AttributeValue::S("amy@example.com".to_owned()));
    }

    #[test]
    fn test_should_reject_sort_key_on_hash_only_table() {
        let err = authors_table()
            .to_input_key(&KeyValues::new("jack@black.com").with_sort_key(json!("x")))
            .unwrap_err();
        assert!(matches!(err, DynormError::PrimaryKey(_)));
    }

    #[test]
    fn test_should_parse_existence_option() {
        assert_eq!(
            "if_not_exists".parse::<ExistenceOption>().unwrap(),
            ExistenceOption::IfNotExists
        );
        assert_eq!(
            "DROP_IF_EXISTS".parse::<ExistenceOption>().unwrap(),
            ExistenceOption::DropIfExists
        );
        assert!("SOMETIMES".parse::<ExistenceOption>().is_err());
    }

    #[tokio::test]
    async fn test_should_create_describe_and_delete_table() {
        let table = Table::new(Arc::new(cookbooks_table()), memory_client());

        assert!(table.describe().await.unwrap().is_none());
        assert!(!table.exists().await.unwrap());

        let created = table.create(ExistenceOption::None).await.unwrap().unwrap();
        assert_eq!(created.table_name.as_deref(), Some("Cookbooks"));

        let described = table.describe().await.unwrap().unwrap();
        assert_eq!(described.table_name.as_deref(), Some("Cookbooks"));

        assert!(table.delete().await.unwrap().is_some());
        assert!(table.delete().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_honour_existence_option() {
        let table = Table::new(Arc::new(cookbooks_table()), memory_client());
        table.create(ExistenceOption::None).await.unwrap();

        let err = table.create(ExistenceOption::None).await.unwrap_err();
        assert!(matches!(
            err,
            DynormError::CreateTable(ref m) if m == "Table already exists \"Cookbooks\""
        ));

        assert!(table.create(ExistenceOption::IfNotExists).await.is_ok());
        assert!(table.create(ExistenceOption::DropIfExists).await.is_ok());
        assert!(table.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_should_propagate_other_store_failures() {
        let table = Table::new(Arc::new(cookbooks_table()), FailingClient::shared());
        assert!(matches!(
            table.describe().await.unwrap_err(),
            DynormError::Store(_)
        ));
    }
}
