//! The memory store: table lifecycle, item CRUD and PartiQL `SELECT`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use dynorm_model::AttributeValue;
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
use dynorm_model::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ReturnValue, TableStatus,
};

use crate::config::MemoryConfig;
use crate::error::{statement_error_to_dynamodb, storage_error_to_dynamodb};
use crate::state::{MemoryState, MemoryTable};
use crate::statement::{EvalContext, apply_update, parse_select, parse_update};
use crate::storage::{KeyAttribute, KeySchema, TableStorage, extract_request_key};

/// An in-process DynamoDB-compatible store.
#[derive(Debug, Clone)]
pub struct MemoryDynamoDB {
    /// Tables and items.
    pub state: Arc<MemoryState>,
    /// Configuration.
    pub config: Arc<MemoryConfig>,
}

impl MemoryDynamoDB {
    /// Create an empty store.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            state: Arc::new(MemoryState::new()),
            config: Arc::new(config),
        }
    }

    /// Drop every table.
    pub fn reset(&self) {
        self.state.reset();
    }

    /// Seed a table from a JSON array of items in DynamoDB JSON form, e.g.
    /// `[{"title": {"S": "Southern Smothered"}, "reviews": {"N": "3"}}]`.
    ///
    /// Returns the number of items written.
    pub fn load_items_json(&self, table_name: &str, json: &str) -> Result<usize, DynamoDBError> {
        let table = self.state.require_table(table_name)?;
        let items: Vec<HashMap<String, AttributeValue>> = serde_json::from_str(json)
            .map_err(|e| DynamoDBError::validation(format!("invalid item fixture: {e}")))?;
        let count = items.len();
        for item in items {
            table
                .storage
                .put_item(item)
                .map_err(storage_error_to_dynamodb)?;
        }
        debug!(table = %table_name, count, "seeded items");
        Ok(count)
    }
}

impl Default for MemoryDynamoDB {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

impl MemoryDynamoDB {
    /// Handle `CreateTable`.
    pub fn handle_create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError> {
        validate_table_name(&input.table_name)?;
        let key_schema = parse_key_schema(&input.key_schema, &input.attribute_definitions)?;
        validate_no_spurious_attribute_definitions(&input.attribute_definitions, &key_schema)?;

        let billing_mode = input.billing_mode.unwrap_or_default();
        if billing_mode == BillingMode::Provisioned && input.provisioned_throughput.is_none() {
            return Err(DynamoDBError::validation(
                "No provisioned throughput specified for the table",
            ));
        }

        let table = MemoryTable {
            arn: self.config.table_arn(&input.table_name),
            name: input.table_name,
            key_schema_elements: input.key_schema,
            attribute_definitions: input.attribute_definitions,
            billing_mode,
            provisioned_throughput: input.provisioned_throughput,
            table_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            storage: TableStorage::new(key_schema),
        };

        let table = self.state.create_table(table)?;
        debug!(table = %table.name, "created table");
        Ok(CreateTableOutput {
            table_description: Some(table.to_description(TableStatus::Active)),
        })
    }

    /// Handle `DeleteTable`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError> {
        let table = self.state.delete_table(&input.table_name)?;
        debug!(table = %table.name, "deleted table");
        Ok(DeleteTableOutput {
            table_description: Some(table.to_description(TableStatus::Deleting)),
        })
    }

    /// Handle `DescribeTable`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        let table = self.state.require_table(&input.table_name)?;
        Ok(DescribeTableOutput {
            table: Some(table.to_description(TableStatus::Active)),
        })
    }
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

impl MemoryDynamoDB {
    /// Handle `PutItem`.
    pub fn handle_put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        let table = self.state.require_table(&input.table_name)?;
        let return_values = input.return_values.unwrap_or_default();
        if return_values == ReturnValue::AllNew {
            return Err(invalid_return_values(return_values));
        }

        let old = table
            .storage
            .put_item(input.item)
            .map_err(storage_error_to_dynamodb)?;

        Ok(PutItemOutput {
            attributes: match return_values {
                ReturnValue::AllOld => old.unwrap_or_default(),
                _ => HashMap::new(),
            },
        })
    }

    /// Handle `GetItem`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        let table = self.state.require_table(&input.table_name)?;
        let key = extract_request_key(table.key_schema(), &input.key)
            .map_err(storage_error_to_dynamodb)?;
        Ok(GetItemOutput {
            item: table.storage.get_item(&key),
        })
    }

    /// Handle `DeleteItem`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_delete_item(
        &self,
        input: DeleteItemInput,
    ) -> Result<DeleteItemOutput, DynamoDBError> {
        let table = self.state.require_table(&input.table_name)?;
        let return_values = input.return_values.unwrap_or_default();
        if return_values == ReturnValue::AllNew {
            return Err(invalid_return_values(return_values));
        }

        let key = extract_request_key(table.key_schema(), &input.key)
            .map_err(storage_error_to_dynamodb)?;
        let old = table.storage.delete_item(&key);

        Ok(DeleteItemOutput {
            attributes: match return_values {
                ReturnValue::AllOld => old.unwrap_or_default(),
                _ => HashMap::new(),
            },
        })
    }

    /// Handle `UpdateItem`.
    ///
    /// Like DynamoDB, updating a missing item creates it from the key.
    pub fn handle_update_item(
        &self,
        input: UpdateItemInput,
    ) -> Result<UpdateItemOutput, DynamoDBError> {
        let table = self.state.require_table(&input.table_name)?;
        let key = extract_request_key(table.key_schema(), &input.key)
            .map_err(storage_error_to_dynamodb)?;

        let expression = input
            .update_expression
            .as_deref()
            .ok_or_else(|| DynamoDBError::validation("UpdateExpression is required"))?;
        let actions = parse_update(expression).map_err(statement_error_to_dynamodb)?;

        let old = table.storage.get_item(&key);
        let mut item = old.clone().unwrap_or_else(|| input.key.clone());
        apply_update(
            &mut item,
            &actions,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )
        .map_err(statement_error_to_dynamodb)?;
        validate_key_unchanged(&input.key, &item)?;

        table
            .storage
            .put_item(item.clone())
            .map_err(storage_error_to_dynamodb)?;

        Ok(UpdateItemOutput {
            attributes: match input.return_values.unwrap_or_default() {
                ReturnValue::AllNew => item,
                ReturnValue::AllOld => old.unwrap_or_default(),
                ReturnValue::None => HashMap::new(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// PartiQL
// ---------------------------------------------------------------------------

impl MemoryDynamoDB {
    /// Handle `ExecuteStatement`.
    ///
    /// `Limit` caps the number of returned items; `NextToken` is the offset of
    /// the next matching item.
    pub fn handle_execute_statement(
        &self,
        input: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput, DynamoDBError> {
        let statement = parse_select(&input.statement).map_err(statement_error_to_dynamodb)?;
        let table = self.state.require_table(&statement.table)?;

        let offset = match input.next_token.as_deref() {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| DynamoDBError::validation("Invalid NextToken"))?,
            None => 0,
        };
        let limit = match input.limit {
            Some(limit) if limit < 1 => {
                return Err(DynamoDBError::validation(
                    "Limit must be greater than or equal to 1",
                ));
            }
            Some(limit) => usize::try_from(limit).unwrap_or(usize::MAX),
            None => usize::MAX,
        };

        let mut matched = Vec::new();
        for item in table.storage.scan() {
            let ctx = EvalContext {
                item: &item,
                parameters: &input.parameters,
            };
            let keep = match &statement.condition {
                Some(condition) => ctx.evaluate(condition).map_err(statement_error_to_dynamodb)?,
                None => true,
            };
            if keep {
                matched.push(ctx.project(&statement.projection));
            }
        }

        let total = matched.len();
        let items: Vec<_> = matched.into_iter().skip(offset).take(limit).collect();
        let consumed = offset + items.len();
        debug!(
            table = %statement.table,
            matched = total,
            returned = items.len(),
            "executed statement"
        );

        Ok(ExecuteStatementOutput {
            items,
            next_token: (consumed < total).then(|| consumed.to_string()),
        })
    }
}

#[async_trait]
impl DynamoDBClient for MemoryDynamoDB {
    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::CreateTable, &input.table_name);
        self.handle_create_table(input)
    }

    async fn delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::DeleteTable, &input.table_name);
        self.handle_delete_table(input)
    }

    async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::DescribeTable, &input.table_name);
        self.handle_describe_table(input)
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::PutItem, &input.table_name);
        self.handle_put_item(input)
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::GetItem, &input.table_name);
        self.handle_get_item(input)
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::UpdateItem, &input.table_name);
        self.handle_update_item(input)
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        trace_operation(DynamoDBOperation::DeleteItem, &input.table_name);
        self.handle_delete_item(input)
    }

    async fn execute_statement(
        &self,
        input: ExecuteStatementInput,
    ) -> Result<ExecuteStatementOutput, DynamoDBError> {
        debug!(operation = %DynamoDBOperation::ExecuteStatement, statement = %input.statement);
        self.handle_execute_statement(input)
    }
}

fn trace_operation(operation: DynamoDBOperation, table: &str) {
    debug!(%operation, table, "memory store call");
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_table_name(name: &str) -> Result<(), DynamoDBError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if (3..=255).contains(&name.len()) && valid_chars {
        Ok(())
    } else {
        Err(DynamoDBError::validation(format!(
            "TableName must be 3-255 characters of [a-zA-Z0-9_.-], got '{name}'"
        )))
    }
}

fn parse_key_schema(
    elements: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> Result<KeySchema, DynamoDBError> {
    let find = |key_type: KeyType| -> Result<Option<KeyAttribute>, DynamoDBError> {
        let mut matching = elements.iter().filter(|e| e.key_type == key_type);
        let Some(element) = matching.next() else {
            return Ok(None);
        };
        if matching.next().is_some() {
            return Err(DynamoDBError::validation(format!(
                "Too many {key_type} keys in key schema"
            )));
        }
        let definition = definitions
            .iter()
            .find(|d| d.attribute_name == element.attribute_name)
            .ok_or_else(|| {
                DynamoDBError::validation(format!(
                    "One or more parameter values were invalid: Some index key attributes are \
                     not defined in AttributeDefinitions. Keys: [{}]",
                    element.attribute_name
                ))
            })?;
        Ok(Some(KeyAttribute {
            name: element.attribute_name.clone(),
            attr_type: definition.attribute_type,
        }))
    };

    let partition_key = find(KeyType::Hash)?
        .ok_or_else(|| DynamoDBError::validation("Key schema must contain a HASH key element"))?;
    let sort_key = find(KeyType::Range)?;

    Ok(KeySchema {
        partition_key,
        sort_key,
    })
}

fn validate_no_spurious_attribute_definitions(
    definitions: &[AttributeDefinition],
    key_schema: &KeySchema,
) -> Result<(), DynamoDBError> {
    match definitions
        .iter()
        .find(|d| !key_schema.is_key_attribute(&d.attribute_name))
    {
        Some(extra) => Err(DynamoDBError::validation(format!(
            "One or more parameter values were invalid: Number of attributes in KeySchema does \
             not exactly match number of attributes defined in AttributeDefinitions \
             (extra: {})",
            extra.attribute_name
        ))),
        None => Ok(()),
    }
}

fn validate_key_unchanged(
    key: &HashMap<String, AttributeValue>,
    item: &HashMap<String, AttributeValue>,
) -> Result<(), DynamoDBError> {
    match key.iter().find(|(name, value)| item.get(*name) != Some(*value)) {
        Some((name, _)) => Err(DynamoDBError::validation(format!(
            "One or more parameter values were invalid: Cannot update attribute {name}. \
             This attribute is part of the key"
        ))),
        None => Ok(()),
    }
}

fn invalid_return_values(value: ReturnValue) -> DynamoDBError {
    DynamoDBError::validation(format!(
        "Return values set to invalid value for this operation: {value}"
    ))
}

#[cfg(test)]
mod tests {
    use dynorm_model::DynamoDBErrorCode;
    use dynorm_model::types::{ProvisionedThroughput, ScalarAttributeType};

    use super::*;

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_owned())
    }

    fn cookbook_table_input() -> CreateTableInput {
        CreateTableInput {
            table_name: "Cookbooks".to_owned(),
            key_schema: vec![
                KeySchemaElement::new("title", KeyType::Hash),
                KeySchemaElement::new("author", KeyType::Range),
            ],
            attribute_definitions: vec![
                AttributeDefinition::new("title", ScalarAttributeType::S),
                AttributeDefinition::new("author", ScalarAttributeType::S),
            ],
            billing_mode: None,
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: 1,
                write_capacity_units: 1,
            }),
        }
    }

    fn store_with_cookbooks() -> MemoryDynamoDB {
        let store = MemoryDynamoDB::default();
        store.handle_create_table(cookbook_table_input()).unwrap();
        store
            .load_items_json(
                "Cookbooks",
                r#"[
                    {"title": {"S": "Southern Smothered"}, "author": {"S": "Toby"}, "reviews": {"N": "5"}},
                    {"title": {"S": "Southern Savories"}, "author": {"S": "Toby"}, "reviews": {"N": "12"}},
                    {"title": {"S": "Bay Breeze"}, "author": {"S": "Amy"}}
                ]"#,
            )
            .unwrap();
        store
    }

    fn key(title: &str, author: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("title".to_owned(), s(title)),
            ("author".to_owned(), s(author)),
        ])
    }

    #[test]
    fn test_should_create_and_describe_table() {
        let store = MemoryDynamoDB::default();
        let out = store.handle_create_table(cookbook_table_input()).unwrap();
        let desc = out.table_description.unwrap();
        assert_eq!(desc.table_name.as_deref(), Some("Cookbooks"));
        assert_eq!(desc.key_schema.len(), 2);

        let described = store
            .handle_describe_table(DescribeTableInput {
                table_name: "Cookbooks".to_owned(),
            })
            .unwrap();
        assert_eq!(
            described.table.unwrap().table_status,
            Some(TableStatus::Active)
        );
    }

    #[test]
    fn test_should_reject_duplicate_table() {
        let store = MemoryDynamoDB::default();
        store.handle_create_table(cookbook_table_input()).unwrap();
        let err = store.handle_create_table(cookbook_table_input()).unwrap_err();
        assert_eq!(err.code, DynamoDBErrorCode::ResourceInUseException);
    }

    #[test]
    fn test_should_report_missing_table_as_bad_request() {
        let store = MemoryDynamoDB::default();
        let err = store
            .handle_put_item(PutItemInput {
                table_name: "Nope".to_owned(),
                item: key("a", "b"),
                return_values: None,
            })
            .unwrap_err();
        assert!(err.is_table_not_found());
    }

    #[test]
    fn test_should_reject_spurious_attribute_definitions() {
        let store = MemoryDynamoDB::default();
        let mut input = cookbook_table_input();
        input
            .attribute_definitions
            .push(AttributeDefinition::new("summary", ScalarAttributeType::S));
        let err = store.handle_create_table(input).unwrap_err();
        assert_eq!(err.code, DynamoDBErrorCode::ValidationException);
    }

    #[test]
    fn test_should_delete_item_returning_old_values() {
        let store = store_with_cookbooks();
        let out = store
            .handle_delete_item(DeleteItemInput {
                table_name: "Cookbooks".to_owned(),
                key: key("Bay Breeze", "Amy"),
                return_values: Some(ReturnValue::AllOld),
            })
            .unwrap();
        assert_eq!(out.attributes["title"], s("Bay Breeze"));

        let again = store
            .handle_delete_item(DeleteItemInput {
                table_name: "Cookbooks".to_owned(),
                key: key("Bay Breeze", "Amy"),
                return_values: Some(ReturnValue::AllOld),
            })
            .unwrap();
        assert!(again.attributes.is_empty());
    }

    #[test]
    fn test_should_update_item_with_placeholders() {
        let store = store_with_cookbooks();
        let out = store
            .handle_update_item(UpdateItemInput {
                table_name: "Cookbooks".to_owned(),
                key: key("Bay Breeze", "Amy"),
                update_expression: Some("SET #summary = :summary".to_owned()),
                expression_attribute_names: HashMap::from([(
                    "#summary".to_owned(),
                    "summary".to_owned(),
                )]),
                expression_attribute_values: HashMap::from([(
                    ":summary".to_owned(),
                    s("breezy"),
                )]),
                return_values: Some(ReturnValue::AllNew),
            })
            .unwrap();
        assert_eq!(out.attributes["summary"], s("breezy"));
        assert_eq!(out.attributes["title"], s("Bay Breeze"));
    }

    #[test]
    fn test_should_refuse_to_update_key_attribute() {
        let store = store_with_cookbooks();
        let err = store
            .handle_update_item(UpdateItemInput {
                table_name: "Cookbooks".to_owned(),
                key: key("Bay Breeze", "Amy"),
                update_expression: Some("SET title = :t".to_owned()),
                expression_attribute_values: HashMap::from([(":t".to_owned(), s("Other"))]),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.message.contains("part of the key"));
    }

    #[test]
    fn test_should_execute_select_with_conditions() {
        let store = store_with_cookbooks();
        let out = store
            .handle_execute_statement(ExecuteStatementInput {
                statement: "SELECT title FROM \"Cookbooks\" WHERE author = 'Toby' AND reviews > 6"
                    .to_owned(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].len(), 1);
        assert_eq!(out.items[0]["title"], s("Southern Savories"));
    }

    #[test]
    fn test_should_page_statement_results() {
        let store = store_with_cookbooks();
        let first = store
            .handle_execute_statement(ExecuteStatementInput {
                statement: "SELECT * FROM Cookbooks".to_owned(),
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let rest = store
            .handle_execute_statement(ExecuteStatementInput {
                statement: "SELECT * FROM Cookbooks".to_owned(),
                next_token: first.next_token,
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rest.items.len(), 1);
        assert!(rest.next_token.is_none());
    }

    #[test]
    fn test_should_fail_statement_on_missing_table() {
        let store = MemoryDynamoDB::default();
        let err = store
            .handle_execute_statement(ExecuteStatementInput {
                statement: "SELECT * FROM Ghost".to_owned(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code, DynamoDBErrorCode::ResourceNotFoundException);
    }

    #[tokio::test]
    async fn test_should_serve_calls_through_client_trait() {
        let store = store_with_cookbooks();
        let client: &dyn DynamoDBClient = &store;
        let out = client
            .get_item(GetItemInput {
                table_name: "Cookbooks".to_owned(),
                key: key("Southern Smothered", "Toby"),
                consistent_read: None,
            })
            .await
            .unwrap();
        assert_eq!(out.item.unwrap()["reviews"], AttributeValue::N("5".to_owned()));
    }
}
