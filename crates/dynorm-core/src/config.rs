//! Declarative schema configuration.
//!
//! A registry can be described in JSON instead of code:
//!
//! ```json
//! {
//!   "entities": [{
//!     "name": "AuthorEntity",
//!     "attributes": [
//!       { "name": "email", "type": "S", "required": true },
//!       { "name": "about", "type": "String", "default": "" }
//!     ]
//!   }],
//!   "tables": [{
//!     "name": "Authors",
//!     "alias": "AuthorTable",
//!     "primaryKey": { "pk": "email" },
//!     "entity": "AuthorEntity"
//!   }],
//!   "models": [{ "name": "AuthorModel", "table": "AuthorTable" }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{AttributeDefinition, AttributeType};
use crate::entity::Entity;
use crate::error::{DynormError, DynormResult};
use crate::registry::ModelDefinition;
use crate::table::{PrimaryKey, TableSchema};

/// One attribute of an entity declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeConfig {
    /// Attribute name.
    pub name: String,
    /// Storage tag (`S`, `SS`, `BOOL`...) or type name (`String`...).
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    /// Whether `validate` insists on a value.
    #[serde(default)]
    pub required: bool,
    /// Initial value of every new model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// An entity declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    /// Entity name, referenced by tables.
    pub name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<AttributeConfig>,
}

/// A table declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Physical table name.
    pub name: String,
    /// Logical name accepted by registry lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Key attributes.
    pub primary_key: PrimaryKey,
    /// Entity name.
    pub entity: String,
}

/// Entities, tables and models of one registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    /// Entity declarations.
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    /// Table declarations.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    /// Model declarations.
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
}

impl SchemaConfig {
    /// Parse a JSON schema document.
    ///
    /// # Errors
    ///
    /// [`DynormError::Config`] when the document is malformed.
    pub fn from_json(json: &str) -> DynormResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DynormError::Config(format!("invalid schema document: {e}")))
    }

    /// Build the table schemas and pass the model declarations through.
    ///
    /// # Errors
    ///
    /// [`DynormError::Config`] when a table names an undeclared entity or an
    /// entity is itself invalid.
    pub fn into_parts(self) -> DynormResult<(Vec<TableSchema>, Vec<ModelDefinition>)> {
        let entities = self
            .entities
            .into_iter()
            .map(EntityConfig::into_entity)
            .collect::<DynormResult<Vec<_>>>()?;

        let tables = self
            .tables
            .into_iter()
            .map(|table| {
                let entity = entities
                    .iter()
                    .find(|e| e.name() == table.entity)
                    .cloned()
                    .ok_or_else(|| {
                        DynormError::Config(format!(
                            "table \"{}\" references undefined entity \"{}\"",
                            table.name, table.entity
                        ))
                    })?;
                let schema = TableSchema::new(table.name, table.primary_key, entity);
                Ok(match table.alias {
                    Some(alias) => schema.with_alias(alias),
                    None => schema,
                })
            })
            .collect::<DynormResult<Vec<_>>>()?;

        Ok((tables, self.models))
    }
}

impl EntityConfig {
    fn into_entity(self) -> DynormResult<Entity> {
        self.attributes
            .into_iter()
            .fold(Entity::builder(self.name), |builder, attribute| {
                let mut definition = AttributeDefinition::new(attribute.attribute_type);
                definition.required = attribute.required;
                definition.value = attribute.default;
                builder.attribute(attribute.name, definition)
            })
            .build()
    }
}
