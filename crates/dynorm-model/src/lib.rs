//! Wire types for dynorm.
//!
//! This crate holds the tagged-union [`AttributeValue`], the request/response
//! shapes of the store operations the mapping layer issues, the store error
//! type, and the [`DynamoDBClient`] trait every backend implements.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod client;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::{AttributeValue, Item};
pub use client::{DynamoDBClient, SharedClient};
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
