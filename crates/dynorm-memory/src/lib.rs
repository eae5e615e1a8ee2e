//! In-process DynamoDB store for dynorm.
//!
//! [`MemoryDynamoDB`] implements [`dynorm_model::DynamoDBClient`] against
//! `DashMap`-backed tables, so models and queries can be exercised without a
//! running endpoint.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod provider;
pub mod state;
pub mod statement;
pub mod storage;

pub use config::MemoryConfig;
pub use provider::MemoryDynamoDB;
