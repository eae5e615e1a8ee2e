//! The registry: every declared table and model plus the shared store client.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use dynorm_model::types::TableDescription;
use dynorm_model::{DynamoDBClient, SharedClient};

use crate::config::SchemaConfig;
use crate::error::{DynormError, DynormResult};
use crate::model::Model;
use crate::query::QueryBuilder;
use crate::table::{ExistenceOption, Table, TableSchema};

/// A named model type bound to one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Model type name.
    pub name: String,
    /// Table name or alias.
    pub table: String,
    /// Initial values, applied over the entity's defaults.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
}

impl ModelDefinition {
    /// Declare `name` on `table`.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            defaults: Map::new(),
        }
    }

    /// Add a default value.
    #[must_use]
    pub fn with_default(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(attribute.into(), value.into());
        self
    }
}

/// Tables, models and one store client. Fixed once built.
#[derive(Debug, Clone)]
pub struct Dynorm {
    client: SharedClient,
    tables: Vec<Arc<TableSchema>>,
    models: Vec<ModelDefinition>,
}

impl Dynorm {
    /// Start declaring a registry.
    #[must_use]
    pub fn builder() -> DynormBuilder {
        DynormBuilder::default()
    }

    /// The shared store client.
    #[must_use]
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// Every table in declaration order.
    #[must_use]
    pub fn get_tables(&self) -> &[Arc<TableSchema>] {
        &self.tables
    }

    /// A table by name or alias.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Arc<TableSchema>> {
        self.tables.iter().find(|t| t.matches(name))
    }

    /// A lifecycle handle for a table, by name or alias.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<Table> {
        self.get_table(name)
            .map(|schema| Table::new(Arc::clone(schema), Arc::clone(&self.client)))
    }

    /// Every model declaration in declaration order.
    #[must_use]
    pub fn get_models(&self) -> &[ModelDefinition] {
        &self.models
    }

    /// A model declaration by name.
    #[must_use]
    pub fn get_model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.name == name)
    }

    /// A fresh model of type `name`.
    ///
    /// Declared models come with their defaults applied. Failing that, an
    /// entity name of any table yields a model of that entity.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<Model> {
        if let Some(definition) = self.get_model(name) {
            let table = self.get_table(&definition.table)?;
            let mut model = Model::new(name, Arc::clone(table), Arc::clone(&self.client));
            model.fill(definition.defaults.iter().map(|(k, v)| (k, v.clone())));
            return Some(model);
        }

        self.tables
            .iter()
            .find(|t| t.entity().name() == name)
            .map(|table| Model::new(name, Arc::clone(table), Arc::clone(&self.client)))
    }

    /// Like [`Self::model`], then fill `attributes`.
    #[must_use]
    pub fn model_with<I, K, V>(&self, name: &str, attributes: I) -> Option<Model>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut model = self.model(name)?;
        model.fill(attributes);
        Some(model)
    }

    /// Create every table, one at a time in declaration order.
    ///
    /// Stops at the first failure; tables already created stay created.
    ///
    /// # Errors
    ///
    /// The first [`Table::create`] failure.
    pub async fn create_tables(
        &self,
        option: ExistenceOption,
    ) -> DynormResult<Vec<TableDescription>> {
        let mut created = Vec::with_capacity(self.tables.len());
        for schema in &self.tables {
            let table = Table::new(Arc::clone(schema), Arc::clone(&self.client));
            if let Some(description) = table.create(option).await? {
                created.push(description);
            }
        }
        info!(count = created.len(), %option, "created tables");
        Ok(created)
    }

    /// Delete every table, one at a time in declaration order. Missing tables
    /// are skipped.
    ///
    /// # Errors
    ///
    /// The first [`Table::delete`] failure.
    pub async fn delete_tables(&self) -> DynormResult<Vec<TableDescription>> {
        let mut deleted = Vec::with_capacity(self.tables.len());
        for schema in &self.tables {
            let table = Table::new(Arc::clone(schema), Arc::clone(&self.client));
            match table.delete().await? {
                Some(description) => deleted.push(description),
                None => debug!(table = %schema.name(), "table missing, nothing to delete"),
            }
        }
        Ok(deleted)
    }

    /// A query bound to `table`.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] when no such table is registered.
    pub fn query(&self, table: &str) -> DynormResult<QueryBuilder<'_>> {
        QueryBuilder::new(self).table(table)
    }

    /// A query with no table bound yet; bind one with `from` or `table`.
    #[must_use]
    pub fn query_builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}

/// Builder for [`Dynorm`].
#[derive(Debug, Default)]
pub struct DynormBuilder {
    client: Option<SharedClient>,
    tables: Vec<TableSchema>,
    models: Vec<ModelDefinition>,
}

impl DynormBuilder {
    /// Use `client` for every store call.
    #[must_use]
    pub fn client(self, client: impl DynamoDBClient + 'static) -> Self {
        self.shared_client(Arc::new(client))
    }

    /// Use an already shared client.
    #[must_use]
    pub fn shared_client(mut self, client: SharedClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Register a table.
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Register a model type.
    #[must_use]
    pub fn model(mut self, model: ModelDefinition) -> Self {
        self.models.push(model);
        self
    }

    /// Register everything a declarative schema describes.
    ///
    /// # Errors
    ///
    /// [`DynormError::Config`] when the schema is inconsistent.
    pub fn schema(mut self, config: SchemaConfig) -> DynormResult<Self> {
        let (tables, models) = config.into_parts()?;
        self.tables.extend(tables);
        self.models.extend(models);
        Ok(self)
    }

    /// Check every declaration and build the registry.
    ///
    /// # Errors
    ///
    /// [`DynormError::Config`] when the client or tables are missing, a
    /// table's key is not declared on its entity, a name is taken twice, or a
    /// model references an unknown table or attribute.
    pub fn build(self) -> DynormResult<Dynorm> {
        let client = match self.client {
            Some(client) if !self.tables.is_empty() => client,
            _ => {
                return Err(DynormError::Config(
                    "A dynamodb client and tables are required".to_owned(),
                ));
            }
        };

        for (index, table) in self.tables.iter().enumerate() {
            table.primary_key_definition()?;
            let taken = self.tables[..index].iter().any(|other| {
                other.matches(table.name()) || table.alias().is_some_and(|a| other.matches(a))
            });
            if taken {
                return Err(DynormError::Config(format!(
                    "table \"{}\" is declared twice",
                    table.name()
                )));
            }
        }
        let tables: Vec<Arc<TableSchema>> = self.tables.into_iter().map(Arc::new).collect();

        for (index, model) in self.models.iter().enumerate() {
            if self.models[..index].iter().any(|m| m.name == model.name) {
                return Err(DynormError::Config(format!(
                    "model \"{}\" is declared twice",
                    model.name
                )));
            }
            let table = tables
                .iter()
                .find(|t| t.matches(&model.table))
                .ok_or_else(|| {
                    DynormError::Config(format!(
                        "model \"{}\" references undefined table \"{}\"",
                        model.name, model.table
                    ))
                })?;
            for (attribute, value) in &model.defaults {
                let definition = table.entity().attribute(attribute).ok_or_else(|| {
                    DynormError::Config(format!(
                        "default \"{attribute}\" of model {} is not defined in {}",
                        model.name,
                        table.entity().name()
                    ))
                })?;
                definition.validate(value).map_err(|e| {
                    DynormError::Config(format!(
                        "default \"{attribute}\" of model {} must be a {e}",
                        model.name
                    ))
                })?;
            }
        }

        debug!(
            tables = tables.len(),
            models = self.models.len(),
            "built registry"
        );
        Ok(Dynorm {
            client,
            tables,
            models: self.models,
        })
    }
}
