//! [`DynamoDBClient`] over `aws_sdk_dynamodb`.

use async_trait::async_trait;
use tracing::debug;

use dynorm_model::client::DynamoDBClient;
use dynorm_model::error::DynamoDBError;
use dynorm_model::input::{
    CreateTableInput, DeleteItemInput, DeleteTableInput, DescribeTableInput,
    ExecuteStatementInput, GetItemInput, PutItemInput, UpdateItemInput,
};
use dynorm_model::operations::DynamoDBOperation;
use dynorm_model::output::{
    CreateTableOutput, DeleteItemOutput, DeleteTableOutput, DescribeTableOutput,
    ExecuteStatementOutput, GetItemOutput, PutItemOutput, UpdateItemOutput,
};

use crate::config::AwsClientConfig;
use crate::convert::{
    from_sdk_item, from_sdk_table_description, to_sdk_attribute_definition, to_sdk_billing_mode,
    to_sdk_item, to_sdk_key_schema_element, to_sdk_return_value, to_sdk_throughput,
    to_sdk_value,
};
use crate::error::sdk_error_to_dynamodb;

/// A store client backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsDynamoDB {
    client: aws_sdk_dynamodb::Client,
}

impl AwsDynamoDB {
    /// Wrap an already configured SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }

    /// Build a client from connection settings.
    pub async fn from_config(config: &AwsClientConfig) -> Self {
        debug!(
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            "building DynamoDB client"
        );
        Self::new(config.load_sdk_client().await)
    }

    /// Build a client from the environment.
    pub async fn from_env() -> Self {
        Self::from_config(&AwsClientConfig::from_env()).await
    }

    /// The wrapped SDK client.
    #[must_use]
    pub fn inner(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }
}

#[async_trait]
impl DynamoDBClient for AwsDynamoDB {
    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::CreateTable, table = %input.table_name);
        let key_schema = input
            .key_schema
            .iter()
            .map(to_sdk_key_schema_element)
            .collect::<Result<Vec<_>, _>>()?;
        let attribute_definitions = input
            .attribute_definitions
            .iter()
            .map(to_sdk_attribute_definition)
            .collect::<Result<Vec<_>, _>>()?;
        let provisioned_throughput = input
            .provisioned_throughput
            .map(to_sdk_throughput)
            .transpose()?;

        let output = self
            .client
            .create_table()
            .table_name(input.table_name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(attribute_definitions))
            .set_billing_mode(input.billing_mode.map(to_sdk_billing_mode))
            .set_provisioned_throughput(provisioned_throughput)
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(CreateTableOutput {
            table_description: output.table_description().map(from_sdk_table_description),
        })
    }

    async fn delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::DeleteTable, table = %input.table_name);
        let output = self
            .client
            .delete_table()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(DeleteTableOutput {
            table_description: output.table_description().map(from_sdk_table_description),
        })
    }

    async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::DescribeTable, table = %input.table_name);
        let output = self
            .client
            .describe_table()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(DescribeTableOutput {
            table: output.table().map(from_sdk_table_description),
        })
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::PutItem, table = %input.table_name);
        let output = self
            .client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(to_sdk_item(input.item)))
            .set_return_values(input.return_values.map(to_sdk_return_value))
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(PutItemOutput {
            attributes: output
                .attributes()
                .cloned()
                .map(from_sdk_item)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::GetItem, table = %input.table_name);
        let output = self
            .client
            .get_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(GetItemOutput {
            item: output.item().cloned().map(from_sdk_item).transpose()?,
        })
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::UpdateItem, table = %input.table_name);
        let names = (!input.expression_attribute_names.is_empty())
            .then_some(input.expression_attribute_names);
        let values = (!input.expression_attribute_values.is_empty())
            .then(|| to_sdk_item(input.expression_attribute_values));

        let output = self
            .client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .set_update_expression(input.update_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .set_return_values(input.return_values.map(to_sdk_return_value))
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(UpdateItemOutput {
            attributes: output
                .attributes()
                .cloned()
                .map(from_sdk_item)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::DeleteItem, table = %input.table_name);
        let output = self
            .client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .set_return_values(input.return_values.map(to_sdk_return_value))
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(DeleteItemOutput {
            attributes: output
                .attributes()
                .cloned()
                .map(from_sdk_item)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    async fn execute_statement(
        &self,
        input: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::ExecuteStatement, statement = %input.statement);
        let parameters = (!input.parameters.is_empty())
            .then(|| input.parameters.into_iter().map(to_sdk_value).collect());

        let output = self
            .client
            .execute_statement()
            .statement(input.statement)
            .set_parameters(parameters)
            .set_consistent_read(input.consistent_read)
            .set_next_token(input.next_token)
            .set_limit(input.limit)
            .send()
            .await
            .map_err(sdk_error_to_dynamodb)?;

        Ok(ExecuteStatementOutput {
            items: output
                .items()
                .iter()
                .cloned()
                .map(from_sdk_item)
                .collect::<Result<_, _>>()?,
            next_token: output.next_token().map(ToOwned::to_owned),
        })
    }
}
