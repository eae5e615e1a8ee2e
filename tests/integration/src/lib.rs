//! Integration tests for dynorm against a DynamoDB-compatible endpoint.
//!
//! These tests need a reachable endpoint, by default DynamoDB Local at
//! `localhost:8000`. They are marked `#[ignore]` so they don't run during
//! normal `cargo test`.
//!
//! Run them with:
//! ```text
//! DYNORM_ENDPOINT_URL=http://localhost:8000 cargo test -p dynorm-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use dynorm_aws::{AwsClientConfig, AwsDynamoDB};
use dynorm_core::{
    AttributeDefinition, AttributeType, Dynorm, Entity, ExistenceOption, ModelDefinition,
    PrimaryKey, TableSchema,
};
use dynorm_model::SharedClient;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the store.
fn endpoint_url() -> String {
    std::env::var("DYNORM_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned())
}

/// A store client pointing at the test endpoint.
pub async fn dynamodb_client() -> SharedClient {
    init_tracing();

    let config = AwsClientConfig::from_env()
        .with_endpoint_url(endpoint_url())
        .with_credentials("test", "test");
    Arc::new(AwsDynamoDB::from_config(&config).await)
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// A cookbook table keyed on `title` + `author`, under a unique name.
pub fn cookbooks_table(name: &str) -> anyhow::Result<TableSchema> {
    let entity = Entity::builder("CookbookEntity")
        .optional("title", AttributeType::String)
        .required("summary", AttributeType::String)
        .optional("author", AttributeType::String)
        .optional("image", AttributeType::StringSet)
        .attribute(
            "reviews",
            AttributeDefinition::new(AttributeType::Number).with_default(0),
        )
        .build()?;
    Ok(TableSchema::new(name, PrimaryKey::composite("title", "author"), entity)
        .with_alias("CookbookTable"))
}

/// A registry over one freshly created cookbook table.
pub async fn cookbook_db(prefix: &str) -> anyhow::Result<Dynorm> {
    let db = Dynorm::builder()
        .shared_client(dynamodb_client().await)
        .table(cookbooks_table(&test_table_name(prefix))?)
        .model(ModelDefinition::new("CookbookModel", "CookbookTable"))
        .build()?;
    db.create_tables(ExistenceOption::DropIfExists).await?;
    Ok(db)
}

/// Drop every table of the registry, ignoring failures.
pub async fn cleanup(db: &Dynorm) {
    if let Err(e) = db.delete_tables().await {
        tracing::warn!(error = %e, "failed to clean up tables");
    }
}

mod test_model;
mod test_query;
mod test_table;
