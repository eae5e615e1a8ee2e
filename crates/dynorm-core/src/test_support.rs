//! Shared fixtures for unit tests.

use std::sync::{Arc, Once};

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use dynorm_memory::MemoryDynamoDB;
use dynorm_model::error::DynamoDBError;
use dynorm_model::input::{
    CreateTableInput, DeleteItemInput, DeleteTableInput, DescribeTableInput,
    ExecuteStatementInput, GetItemInput, PutItemInput, UpdateItemInput,
};
use dynorm_model::output::{
    CreateTableOutput, DeleteItemOutput, DeleteTableOutput, DescribeTableOutput,
    ExecuteStatementOutput, GetItemOutput, PutItemOutput, UpdateItemOutput,
};
use dynorm_model::{DynamoDBClient, SharedClient};

use crate::attribute::{AttributeDefinition, AttributeType};
use crate::entity::Entity;
use crate::model::Model;
use crate::registry::{Dynorm, ModelDefinition};
use crate::table::{ExistenceOption, PrimaryKey, TableSchema};

pub const DEFAULT_TITLE: &str = "Southern Cornbread";
pub const DEFAULT_SUMMARY: &str =
    "A cookbook with some of the best southern gravy recipes on the internet";

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn memory_client() -> SharedClient {
    Arc::new(MemoryDynamoDB::default())
}

/// A client whose every call fails with the same error.
#[derive(Debug)]
pub struct FailingClient {
    error: fn() -> DynamoDBError,
}

impl FailingClient {
    /// Fails with a generic server error.
    pub fn shared() -> SharedClient {
        Self::with_error(|| DynamoDBError::internal_error("store is down"))
    }

    pub fn with_error(error: fn() -> DynamoDBError) -> SharedClient {
        Arc::new(Self { error })
    }
}

#[async_trait]
impl DynamoDBClient for FailingClient {
    async fn create_table(&self, _: CreateTableInput) -> Result<CreateTableOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn delete_table(&self, _: DeleteTableInput) -> Result<DeleteTableOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn describe_table(
        &self,
        _: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn put_item(&self, _: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn get_item(&self, _: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn update_item(&self, _: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn delete_item(&self, _: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        Err((self.error)())
    }

    async fn execute_statement(
        &self,
        _: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput, DynamoDBError> {
        Err((self.error)())
    }
}

pub fn cookbooks_table() -> TableSchema {
    let entity = Entity::builder("CookbookEntity")
        .optional("title", AttributeType::String)
        .attribute(
            "summary",
            AttributeDefinition::new(AttributeType::String).required(),
        )
        .optional("description", AttributeType::String)
        .optional("author", AttributeType::String)
        .optional("image", AttributeType::StringSet)
        .optional("reviews", AttributeType::Number)
        .build()
        .unwrap();
    TableSchema::new("Cookbooks", PrimaryKey::composite("title", "author"), entity)
        .with_alias("CookbookTable")
}

pub fn authors_table() -> TableSchema {
    let entity = Entity::builder("AuthorEntity")
        .optional("firstName", AttributeType::String)
        .optional("lastName", AttributeType::String)
        .optional("email", AttributeType::String)
        .optional("image", AttributeType::String)
        .optional("about", AttributeType::String)
        .optional("socialMediaLinks", AttributeType::Map)
        .build()
        .unwrap();
    TableSchema::new("Authors", PrimaryKey::new("email"), entity).with_alias("AuthorTable")
}

/// Keyed on an attribute its entity never declares.
pub fn recipes_table() -> TableSchema {
    let entity = Entity::builder("RecipeEntity")
        .optional("cookbook", AttributeType::String)
        .optional("title", AttributeType::String)
        .optional("subject", AttributeType::String)
        .optional("body", AttributeType::String)
        .optional("user", AttributeType::String)
        .build()
        .unwrap();
    TableSchema::new("Recipes", PrimaryKey::new("id"), entity)
}

/// A `CookbookModel` with its title and summary defaults applied.
pub fn cookbook_model(client: SharedClient) -> Model {
    let mut model = Model::new("CookbookModel", Arc::new(cookbooks_table()), client);
    model.fill([("title", DEFAULT_TITLE), ("summary", DEFAULT_SUMMARY)]);
    model
}

/// A registry over the cookbook and author tables. Nothing is created.
pub fn registry_with(client: SharedClient) -> Dynorm {
    Dynorm::builder()
        .shared_client(client)
        .table(cookbooks_table())
        .table(authors_table())
        .model(
            ModelDefinition::new("CookbookModel", "CookbookTable")
                .with_default("title", DEFAULT_TITLE)
                .with_default("summary", DEFAULT_SUMMARY),
        )
        .model(ModelDefinition::new("AuthorModel", "Authors"))
        .build()
        .unwrap()
}

/// A registry on a fresh memory store with both tables created and the
/// cookbook fixture loaded.
pub async fn seeded_db() -> (Dynorm, SharedClient) {
    let memory = MemoryDynamoDB::default();
    let client: SharedClient = Arc::new(memory.clone());
    let db = registry_with(Arc::clone(&client));
    db.create_tables(ExistenceOption::None).await.unwrap();
    memory
        .load_items_json("Cookbooks", include_str!("../fixtures/cookbooks.json"))
        .unwrap();
    (db, client)
}
