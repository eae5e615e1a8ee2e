//! The store client seam.
//!
//! The mapping layer never talks to a concrete SDK. Everything it needs from
//! the store goes through [`DynamoDBClient`], which is implemented by the
//! in-process engine (`dynorm-memory`) and the AWS SDK backend (`dynorm-aws`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DynamoDBError;
use crate::input::{
    CreateTableInput, DeleteItemInput, DeleteTableInput, DescribeTableInput,
    ExecuteStatementInput, GetItemInput, PutItemInput, UpdateItemInput,
};
use crate::output::{
    CreateTableOutput, DeleteItemOutput, DeleteTableOutput, DescribeTableOutput,
    ExecuteStatementOutput, GetItemOutput, PutItemOutput, UpdateItemOutput,
};

/// Data-plane and control-plane operations of a DynamoDB-compatible store.
///
/// Implementations must be safe to share across tasks; the registry hands one
/// `Arc<dyn DynamoDBClient>` to every table handle, model and query.
#[async_trait]
pub trait DynamoDBClient: Send + Sync + std::fmt::Debug {
    /// Create a table.
    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError>;

    /// Delete a table.
    async fn delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError>;

    /// Describe a table.
    async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError>;

    /// Insert or replace an item.
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError>;

    /// Fetch an item by primary key.
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError>;

    /// Update an item in place.
    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError>;

    /// Delete an item by primary key.
    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError>;

    /// Execute a PartiQL statement.
    async fn execute_statement(
        &self,
        input: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput, DynamoDBError>;
}

/// A shared client handle.
pub type SharedClient = Arc<dyn DynamoDBClient>;
