//! Fluent PartiQL query builder.
//!
//! A query is a table, an optional projection, and an ordered chain of
//! conditions joined by `AND`/`OR` exactly as appended:
//!
//! ```text
//! SELECT title, author FROM "Cookbooks" WHERE title = 'A' AND author = 'B'
//! ```
//!
//! Condition values are always rendered as quoted string literals.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use dynorm_model::input::{DeleteItemInput, ExecuteStatementInput};
use dynorm_model::types::ReturnValue;

use crate::error::{DynormError, DynormResult};
use crate::marshal::from_attribute_value;
use crate::model::Model;
use crate::registry::Dynorm;
use crate::table::{KeyValues, TableSchema};

/// Comparison operators accepted by `where_`, `and` and `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

impl ComparisonOperator {
    /// The operator as written in a statement.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = DynormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Self::Eq),
            "<>" => Ok(Self::Ne),
            "!=" => Ok(Self::NotEq),
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Ge),
            "<=" => Ok(Self::Le),
            other => Err(DynormError::Query(format!(
                "unsupported comparison operator \"{other}\""
            ))),
        }
    }
}

/// Logical connective between two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

/// `attribute operator value`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    /// Attribute name.
    pub attribute: String,
    /// Comparison.
    pub operator: ComparisonOperator,
    /// Right-hand value.
    pub value: Value,
}

/// One element of the condition chain.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryToken {
    /// A comparison.
    Condition(QueryCondition),
    /// A connective between the previous and the next comparison.
    Operator(LogicalOperator),
}

/// Builds and runs a `SELECT` (or a keyed delete) against one table.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    db: &'a Dynorm,
    table: Option<Arc<TableSchema>>,
    attributes: Vec<String>,
    conditions: Vec<QueryToken>,
    limit: Option<i32>,
}

impl<'a> QueryBuilder<'a> {
    /// A query with no table bound yet.
    #[must_use]
    pub fn new(db: &'a Dynorm) -> Self {
        Self {
            db,
            table: None,
            attributes: Vec::new(),
            conditions: Vec::new(),
            limit: None,
        }
    }

    /// Bind the table, by name or alias.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] when no such table is registered.
    pub fn table(mut self, name: &str) -> DynormResult<Self> {
        let table = self
            .db
            .get_table(name)
            .ok_or_else(|| DynormError::Query(format!("Table not defined \"{name}\"")))?;
        self.table = Some(Arc::clone(table));
        Ok(self)
    }

    /// Same as [`Self::table`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::table`].
    pub fn from(self, name: &str) -> DynormResult<Self> {
        self.table(name)
    }

    /// Restrict the projection. `["*"]` selects every attribute.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] when an attribute is not declared.
    pub fn select<I, S>(mut self, attributes: I) -> DynormResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        if attributes.len() == 1 && attributes[0] == "*" {
            return Ok(self);
        }
        for attribute in attributes {
            self.check_attribute(&attribute)?;
            self.attributes.push(attribute);
        }
        Ok(self)
    }

    /// Start the condition chain.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] for an undeclared attribute or unknown operator.
    pub fn where_(
        mut self,
        attribute: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> DynormResult<Self> {
        self.check_attribute(attribute)?;
        self.conditions.push(QueryToken::Condition(QueryCondition {
            attribute: attribute.to_owned(),
            operator: operator.parse()?,
            value: value.into(),
        }));
        Ok(self)
    }

    /// Append `AND attribute operator value`.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] when no `where_` came first, or as [`Self::where_`].
    pub fn and(self, attribute: &str, operator: &str, value: impl Into<Value>) -> DynormResult<Self> {
        self.logical(LogicalOperator::And, attribute, operator, value)
    }

    /// Append `OR attribute operator value`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::and`].
    pub fn or(self, attribute: &str, operator: &str, value: impl Into<Value>) -> DynormResult<Self> {
        self.logical(LogicalOperator::Or, attribute, operator, value)
    }

    fn logical(
        mut self,
        connective: LogicalOperator,
        attribute: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> DynormResult<Self> {
        if self.conditions.is_empty() {
            let call = match connective {
                LogicalOperator::And => "and",
                LogicalOperator::Or => "or",
            };
            return Err(DynormError::Query(format!(
                "\"{call}()\" must follow at least one \"where()\" call"
            )));
        }
        self.conditions.push(QueryToken::Operator(connective));
        self.where_(attribute, operator, value)
    }

    /// Cap the number of returned items. Zero or less means no cap.
    #[must_use]
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// The condition chain so far.
    #[must_use]
    pub fn conditions(&self) -> &[QueryToken] {
        &self.conditions
    }

    fn bound_table(&self) -> DynormResult<&Arc<TableSchema>> {
        self.table.as_ref().ok_or_else(|| {
            DynormError::Query(
                "table must be set before running a query, call table() first".to_owned(),
            )
        })
    }

    fn check_attribute(&self, attribute: &str) -> DynormResult<()> {
        let entity = self.bound_table()?.entity();
        if entity.has_attribute(attribute) {
            Ok(())
        } else {
            Err(DynormError::Query(format!(
                "attribute \"{attribute}\" not defined in {}",
                entity.name()
            )))
        }
    }

    /// Compile the `SELECT` statement.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] when no table is bound or a condition value does
    /// not match its attribute type.
    pub fn compile(&self) -> DynormResult<ExecuteStatementInput> {
        let table = self.bound_table()?;
        let projection = if self.attributes.is_empty() {
            "*".to_owned()
        } else {
            self.attributes.join(", ")
        };

        let mut statement = format!("SELECT {projection} FROM \"{}\"", table.name());
        if !self.conditions.is_empty() {
            statement.push_str(" WHERE");
        }
        for token in &self.conditions {
            match token {
                QueryToken::Condition(condition) => {
                    check_condition_value(table, condition)?;
                    statement.push_str(&format!(
                        " {} {} '{}'",
                        condition.attribute,
                        condition.operator,
                        quote_literal(&condition.value)
                    ));
                }
                QueryToken::Operator(operator) => {
                    statement.push_str(&format!(" {operator}"));
                }
            }
        }

        Ok(ExecuteStatementInput {
            statement,
            limit: self.limit,
            ..Default::default()
        })
    }

    /// Run the query.
    ///
    /// Each row becomes a model carrying every entity attribute: values the
    /// row holds, entity defaults for the rest. A failed store call is logged
    /// and yields no rows.
    ///
    /// # Errors
    ///
    /// Same as [`Self::compile`].
    pub async fn get(&self) -> DynormResult<Vec<Model>> {
        let table = self.bound_table()?;
        let input = self.compile()?;
        debug!(table = %table.name(), statement = %input.statement, "executing query");

        let output = match self.db.client().execute_statement(input).await {
            Ok(output) => output,
            Err(e) => {
                error!(table = %table.name(), error = %e, "query failed");
                return Ok(Vec::new());
            }
        };

        let models = output
            .items
            .iter()
            .map(|item| {
                let mut model = Model::new(
                    table.entity().name(),
                    Arc::clone(table),
                    Arc::clone(self.db.client()),
                );
                for name in table.entity().attribute_names() {
                    if let Some(value) = item.get(name) {
                        model.set(name, from_attribute_value(value));
                    }
                }
                model
            })
            .collect();
        Ok(models)
    }

    /// Run the query with a limit of one and return the first row.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn first(self) -> DynormResult<Option<Model>> {
        let models = self.limit(1).get().await?;
        Ok(models.into_iter().next())
    }

    /// Delete the item addressed by the chain's key equalities.
    ///
    /// The chain must be `AND`-only and consist of exactly one `=` condition
    /// on the partition key and, when the table has one, on the sort key.
    /// Returns whether an item was removed.
    ///
    /// # Errors
    ///
    /// [`DynormError::Query`] when the key is not fully covered, a condition
    /// names a non-key attribute, or a key value does not fit its type;
    /// [`DynormError::Store`] when the store call fails.
    pub async fn delete(&self) -> DynormResult<bool> {
        let table = self.bound_table()?;
        let key = self.key_from_conditions(table)?;
        let input = DeleteItemInput {
            table_name: table.name().to_owned(),
            key: table.to_input_key(&key)?,
            return_values: Some(ReturnValue::AllOld),
        };

        let output = self.db.client().delete_item(input).await?;
        debug!(table = %table.name(), deleted = !output.attributes.is_empty(), "query delete");
        Ok(!output.attributes.is_empty())
    }

    fn key_from_conditions(&self, table: &TableSchema) -> DynormResult<KeyValues> {
        let primary_key = table.primary_key();
        let insufficient = || {
            let requirement = match &primary_key.sk {
                Some(sk) => format!(
                    "partition key \"{}\" and sort key \"{sk}\"",
                    primary_key.pk
                ),
                None => format!("partition key \"{}\"", primary_key.pk),
            };
            DynormError::Query(format!(
                "delete() requires equality conditions joined by and() on {requirement} of {}",
                table.name()
            ))
        };

        let mut pk = None;
        let mut sk = None;
        for token in &self.conditions {
            let condition = match token {
                QueryToken::Operator(LogicalOperator::And) => continue,
                QueryToken::Operator(LogicalOperator::Or) => return Err(insufficient()),
                QueryToken::Condition(condition) => condition,
            };

            let slot = if condition.attribute == primary_key.pk {
                &mut pk
            } else if primary_key.sk.as_deref() == Some(condition.attribute.as_str()) {
                &mut sk
            } else {
                return Err(DynormError::Query(format!(
                    "delete() accepts only key conditions, \"{}\" is not part of the primary key of {}",
                    condition.attribute,
                    table.name()
                )));
            };
            if condition.operator != ComparisonOperator::Eq || slot.is_some() {
                return Err(insufficient());
            }
            check_condition_value(table, condition)?;
            *slot = Some(condition.value.clone());
        }

        let pk = pk.ok_or_else(insufficient)?;
        if primary_key.sk.is_some() && sk.is_none() {
            return Err(insufficient());
        }
        Ok(KeyValues { pk: Some(pk), sk })
    }
}

/// Check a condition's value against its attribute's declared type.
fn check_condition_value(table: &TableSchema, condition: &QueryCondition) -> DynormResult<()> {
    let definition = table.entity().attribute(&condition.attribute).ok_or_else(|| {
        DynormError::Query(format!(
            "attribute \"{}\" not defined in {}",
            condition.attribute,
            table.entity().name()
        ))
    })?;
    definition.validate(&condition.value).map_err(|e| {
        DynormError::Query(format!(
            "attribute \"{}\" should be of type {e}",
            condition.attribute
        ))
    })
}

/// Render a value as the body of a single-quoted literal, doubling quotes.
fn quote_literal(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.replace('\'', "''")
}
