//! Object mapping for DynamoDB.
//!
//! Declare entities (typed attribute schemas), bind each to a table with a
//! primary key, and register both in a [`Dynorm`] registry alongside one
//! store client. Models read and write records; the [`QueryBuilder`] compiles
//! fluent condition chains into PartiQL `SELECT` statements.
//!
//! ```no_run
//! # async fn run(client: dynorm_model::SharedClient) -> dynorm_core::DynormResult<()> {
//! use dynorm_core::{AttributeType, Dynorm, Entity, ExistenceOption, PrimaryKey, TableSchema};
//!
//! let entity = Entity::builder("AuthorEntity")
//!     .required("email", AttributeType::String)
//!     .optional("about", AttributeType::String)
//!     .build()?;
//! let db = Dynorm::builder()
//!     .shared_client(client)
//!     .table(TableSchema::new("Authors", PrimaryKey::new("email"), entity))
//!     .build()?;
//! db.create_tables(ExistenceOption::IfNotExists).await?;
//!
//! let _authors = db.query("Authors")?.where_("email", "=", "jack@black.com")?.get().await?;
//! # Ok(())
//! # }
//! ```
// "DynamoDB" and "PartiQL" appear in most doc comments.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute;
pub mod config;
pub mod entity;
pub mod error;
pub mod marshal;
pub mod model;
pub mod query;
pub mod registry;
pub mod table;

#[cfg(test)]
mod test_support;

pub use attribute::{AttributeDefinition, AttributeType, AttributeTypeError, validate};
pub use config::SchemaConfig;
pub use entity::{Entity, EntityBuilder};
pub use error::{DynormError, DynormResult};
pub use model::{Model, ValidationReport};
pub use query::{ComparisonOperator, QueryBuilder};
pub use registry::{Dynorm, DynormBuilder, ModelDefinition};
pub use table::{ExistenceOption, KeyValues, PrimaryKey, Table, TableSchema};
