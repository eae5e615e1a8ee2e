//! AWS SDK backend for dynorm.
//!
//! [`AwsDynamoDB`] adapts an `aws_sdk_dynamodb::Client` to the
//! [`dynorm_model::DynamoDBClient`] trait. Build one from the environment with
//! [`AwsClientConfig::from_env`], or wrap a client you already configured.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod convert;
pub mod error;

pub use client::AwsDynamoDB;
pub use config::AwsClientConfig;
