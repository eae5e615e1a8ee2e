//! Models: value-bearing records bound to one table and one store client.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use dynorm_model::error::{DynamoDBError, DynamoDBErrorCode};
use dynorm_model::input::{DeleteItemInput, GetItemInput, PutItemInput, UpdateItemInput};
use dynorm_model::types::ReturnValue;
use dynorm_model::{Item, SharedClient};

use crate::attribute::{AttributeDefinition, AttributeTypeError, validate};
use crate::entity::Entity;
use crate::error::{DynormError, DynormResult};
use crate::marshal::{from_attribute_value, to_attribute_value};
use crate::table::{KeyValues, TableSchema};

/// Outcome of [`Model::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// `true` when `errors` is empty.
    pub valid: bool,
    /// Failure messages in check order.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Turn a failed report into [`DynormError::Validation`].
    ///
    /// # Errors
    ///
    /// When the report is not valid.
    pub fn into_result(self) -> DynormResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(DynormError::Validation {
                messages: self.errors,
            })
        }
    }
}

/// A record of one table's entity.
///
/// Attribute slots follow the entity's declaration order. A slot is either
/// set to a JSON value or unset.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    table: Arc<TableSchema>,
    client: SharedClient,
    attributes: Vec<(String, AttributeDefinition)>,
}

impl Model {
    /// Create a model named `name`, seeded with the entity's defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, table: Arc<TableSchema>, client: SharedClient) -> Self {
        let attributes = table.entity().definitions().to_vec();
        Self {
            name: name.into(),
            table,
            client,
            attributes,
        }
    }

    /// Model type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound table.
    #[must_use]
    pub fn table(&self) -> &Arc<TableSchema> {
        &self.table
    }

    /// Bound entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        self.table.entity()
    }

    /// Attribute slots in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeDefinition)> {
        self.attributes.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Values of every set attribute, in declaration order.
    #[must_use]
    pub fn attribute_values(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .filter_map(|(n, d)| d.value.clone().map(|v| (n.clone(), v)))
            .collect()
    }

    /// Whether `name` is a declared attribute.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    fn slot(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find_map(|(n, d)| (n == name).then_some(d))
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut AttributeDefinition> {
        self.attributes
            .iter_mut()
            .find_map(|(n, d)| (n == name).then_some(d))
    }

    /// Assign several attributes. Unknown names are ignored.
    pub fn fill<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value);
        }
        self
    }

    /// Assign an attribute without validation. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(slot) = self.slot_mut(name) {
            slot.value = Some(value.into());
        }
        self
    }

    /// Assign an attribute after checking it against the declared type.
    /// Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// [`AttributeTypeError`] naming the attribute and this model when the
    /// value does not fit; the slot keeps its previous value.
    pub fn set_validated(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, AttributeTypeError> {
        let model = self.name.clone();
        if let Some(slot) = self.slot_mut(name) {
            let value = value.into();
            slot.validate(&value).map_err(|e| AttributeTypeError {
                attribute: name.to_owned(),
                expected: e.expected,
                model,
            })?;
            slot.value = Some(value);
        }
        Ok(self)
    }

    /// Unset an attribute.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        if let Some(slot) = self.slot_mut(name) {
            slot.value = None;
        }
        self
    }

    /// Current value of an attribute.
    ///
    /// # Errors
    ///
    /// [`DynormError::AttributeNotFound`] when `name` is not declared.
    pub fn get(&self, name: &str) -> DynormResult<Option<&Value>> {
        self.slot(name)
            .map(|slot| slot.value.as_ref())
            .ok_or_else(|| DynormError::AttributeNotFound(name.to_owned()))
    }

    /// Unset every attribute.
    pub fn clear(&mut self) {
        for (_, slot) in &mut self.attributes {
            slot.value = None;
        }
    }

    /// Current values of the key attributes.
    #[must_use]
    pub fn primary_key(&self) -> KeyValues {
        let key = self.table.primary_key();
        let value_of = |name: &str| self.slot(name).and_then(|s| s.value.clone());
        KeyValues {
            pk: value_of(&key.pk),
            sk: key.sk.as_deref().and_then(value_of),
        }
    }

    /// Check keys, required attributes and attribute types.
    ///
    /// Every failure is collected; a missing key attribute is reported once.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let mut reported: Vec<&str> = Vec::new();
        let key = self.table.primary_key();
        let entity = self.entity().name();

        let mut check_key = |role: &str, attribute: &str| {
            match self.slot(attribute) {
                None => {
                    errors.push(format!(
                        "{role} key \"{attribute}\" is not defined in {entity}"
                    ));
                }
                Some(slot) if slot.value.is_none() => {
                    errors.push(format!(
                        "{role} key \"{attribute}\" is not set on {}",
                        self.name
                    ));
                }
                Some(_) => return false,
            }
            true
        };

        if check_key("Partition", &key.pk) {
            reported.push(&key.pk);
        }
        if let Some(sk) = key.sk.as_deref() {
            if check_key("Sort", sk) {
                reported.push(sk);
            }
        }

        for (name, slot) in &self.attributes {
            match &slot.value {
                None if slot.required && !reported.contains(&name.as_str()) => {
                    errors.push(format!("\"{name}\" is required on {}", self.name));
                }
                None => {}
                Some(value) => {
                    if let Err(e) = validate(slot.attribute_type, value) {
                        errors.push(format!("\"{name}\" must be a {e}"));
                    }
                }
            }
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Every set attribute in its tagged store form.
    ///
    /// # Errors
    ///
    /// [`DynormError::Marshal`] when a value cannot be encoded.
    pub fn to_item(&self) -> DynormResult<Item> {
        self.attributes
            .iter()
            .filter_map(|(name, slot)| {
                slot.value.as_ref().map(|value| {
                    to_attribute_value(name, slot.attribute_type, value)
                        .map(|v| (name.clone(), v))
                })
            })
            .collect()
    }

    /// Validate, then write the record.
    ///
    /// # Errors
    ///
    /// [`DynormError::Validation`] before any store call when invalid;
    /// [`DynormError::TableNotFound`] or [`DynormError::ServiceUnavailable`]
    /// when the store rejects the write.
    pub async fn save(&self) -> DynormResult<()> {
        self.validate().into_result()?;
        let input = PutItemInput {
            table_name: self.table.name().to_owned(),
            item: self.to_item()?,
            return_values: None,
        };

        self.client
            .put_item(input)
            .await
            .map_err(|e| self.write_error(&e))?;
        debug!(model = %self.name, table = %self.table.name(), "saved model");
        Ok(())
    }

    /// Fetch the record addressed by this model's own key.
    ///
    /// # Errors
    ///
    /// [`DynormError::PrimaryKey`] when a key value is missing;
    /// [`DynormError::Marshal`] when a key value does not fit its type;
    /// [`DynormError::Store`] when the store call fails.
    pub async fn find(&self) -> DynormResult<Option<Self>> {
        self.find_by(self.primary_key()).await
    }

    /// Fetch the record addressed by `key` as a new model of the same type.
    ///
    /// # Errors
    ///
    /// Same as [`Self::find`].
    pub async fn find_by(&self, key: KeyValues) -> DynormResult<Option<Self>> {
        let key = self.input_key(&key, "fetch")?;
        let input = GetItemInput {
            table_name: self.table.name().to_owned(),
            key,
            consistent_read: None,
        };

        let output = self.client.get_item(input).await?;
        Ok(output.item.map(|item| self.with_item(&item)))
    }

    /// Reload this model's attributes from the store.
    ///
    /// Returns `false` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::find`].
    pub async fn fresh(&mut self) -> DynormResult<bool> {
        self.require_full_key(&self.primary_key(), "fetch")?;
        match self.find().await? {
            Some(found) => {
                self.attributes = found.attributes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete the record addressed by this model's own key.
    ///
    /// Returns whether a record was removed. Store failures are logged and
    /// reported as `false`.
    ///
    /// # Errors
    ///
    /// [`DynormError::PrimaryKey`] when a key value is missing;
    /// [`DynormError::Marshal`] when a key value does not fit its type.
    pub async fn delete(&self) -> DynormResult<bool> {
        self.delete_by(self.primary_key()).await
    }

    /// Delete the record addressed by `key`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::delete`].
    pub async fn delete_by(&self, key: KeyValues) -> DynormResult<bool> {
        let key = self.input_key(&key, "delete")?;
        let input = DeleteItemInput {
            table_name: self.table.name().to_owned(),
            key,
            return_values: Some(ReturnValue::AllOld),
        };

        match self.client.delete_item(input).await {
            Ok(output) => Ok(!output.attributes.is_empty()),
            Err(e) => {
                error!(model = %self.name, table = %self.table.name(), error = %e, "failed to delete model");
                Ok(false)
            }
        }
    }

    /// Validate, then write every non-key attribute that holds a value and
    /// refill the model from the stored record.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save`].
    pub async fn update(&mut self) -> DynormResult<()> {
        self.validate().into_result()?;
        let key = self.input_key(&self.primary_key(), "update")?;

        let mut assignments = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        for (name, slot) in &self.attributes {
            let Some(value) = &slot.value else { continue };
            if key.contains_key(name) {
                continue;
            }
            let placeholder = placeholder_name(name);
            assignments.push(format!("#{placeholder} = :{placeholder}"));
            names.insert(format!("#{placeholder}"), name.clone());
            values.insert(
                format!(":{placeholder}"),
                to_attribute_value(name, slot.attribute_type, value)?,
            );
        }

        if assignments.is_empty() {
            debug!(model = %self.name, "nothing to update");
            return Ok(());
        }

        let input = UpdateItemInput {
            table_name: self.table.name().to_owned(),
            key,
            update_expression: Some(format!("SET {}", assignments.join(", "))),
            expression_attribute_names: names,
            expression_attribute_values: values,
            return_values: Some(ReturnValue::AllNew),
        };

        let output = self
            .client
            .update_item(input)
            .await
            .map_err(|e| self.write_error(&e))?;
        *self = self.with_item(&output.attributes);
        info!(model = %self.name, table = %self.table.name(), "updated model");
        Ok(())
    }

    fn require_full_key(&self, key: &KeyValues, action: &str) -> DynormResult<()> {
        if key.pk.is_none() || (self.table.has_sort_key() && key.sk.is_none()) {
            return Err(self.key_error(action));
        }
        Ok(())
    }

    fn input_key(&self, key: &KeyValues, action: &str) -> DynormResult<Item> {
        self.require_full_key(key, action)?;
        self.table.to_input_key(key)
    }

    fn key_error(&self, action: &str) -> DynormError {
        let requirement = if self.table.has_sort_key() {
            "partition key and sort key"
        } else {
            "partition key"
        };
        DynormError::PrimaryKey(format!(
            "Failed to {action} item. Primary key requires {requirement} on {}",
            self.name
        ))
    }

    /// A model of the same type holding exactly the attributes of `item`.
    fn with_item(&self, item: &Item) -> Self {
        let mut model = self.clone();
        model.clear();
        for (name, value) in item {
            model.set(name, from_attribute_value(value));
        }
        model
    }

    fn write_error(&self, e: &DynamoDBError) -> DynormError {
        if e.is_table_not_found() {
            return DynormError::TableNotFound(format!(
                "dynamodb table does not exist \"{}\"",
                self.table.name()
            ));
        }
        let message = format!("Failed to save dynamo model {}. {}", self.name, e.message);
        error!(model = %self.name, table = %self.table.name(), error = %e, "store write failed");
        if e.code == DynamoDBErrorCode::ResourceNotFoundException {
            DynormError::TableNotFound(message)
        } else {
            DynormError::ServiceUnavailable(message)
        }
    }
}

/// `#`/`:` placeholder stem for an attribute name: lower-cased, whitespace
/// runs replaced by `_`.
fn placeholder_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use dynorm_model::AttributeValue;

    use super::*;
    use crate::test_support::{
        FailingClient, cookbook_model, cookbooks_table, init_tracing, memory_client,
        recipes_table, seeded_db,
    };

    #[test]
    fn test_should_ignore_unknown_attributes_on_set() {
        let mut model = cookbook_model(memory_client());
        model.set("noAttribute", "x");
        assert!(!model.has("noAttribute"));
        assert!(matches!(
            model.get("noAttribute"),
            Err(DynormError::AttributeNotFound(ref n)) if n == "noAttribute"
        ));
    }

    #[test]
    fn test_should_read_defaults_and_assignments() {
        let mut model = cookbook_model(memory_client());
        assert_eq!(model.get("title").unwrap(), Some(&json!("Southern Cornbread")));

        model.set("title", "Down South Cooking");
        assert_eq!(model.get("title").unwrap(), Some(&json!("Down South Cooking")));

        model.fill([("title", "Good Cookin"), ("summary", "A collection of good recipes")]);
        let values = model.attribute_values();
        assert_eq!(values["title"], json!("Good Cookin"));
        assert_eq!(values["summary"], json!("A collection of good recipes"));
    }

    #[test]
    fn test_should_validate_on_validated_assignment() {
        let mut model = cookbook_model(memory_client());
        model.set_validated("title", "Southern Cooking").unwrap();
        model
            .set_validated("image", json!(["http://pathtoimage.com"]))
            .unwrap();
        model.set_validated("reviews", 5).unwrap();
        assert_eq!(model.get("title").unwrap(), Some(&json!("Southern Cooking")));

        let err = model.set_validated("title", json!([])).unwrap_err();
        assert_eq!(err.to_string(), "title must be a string on CookbookModel");
        assert!(model.set_validated("image", "http://pathtoimage.com").is_err());
        assert!(model.set_validated("reviews", "70").is_err());
        assert!(model.set_validated("reviews", json!(["70"])).is_err());
        assert_eq!(model.get("reviews").unwrap(), Some(&json!(5)));

        // The unvalidated path accepts anything.
        model.set("reviews", "70");
        assert_eq!(model.get("reviews").unwrap(), Some(&json!("70")));
    }

    #[test]
    fn test_should_pass_validation_when_fully_populated() {
        let mut model = cookbook_model(memory_client());
        model.fill([
            ("author", json!("dev@studiowebfx.com")),
            ("image", json!(["cover.png"])),
            ("reviews", json!(4)),
        ]);
        assert_eq!(
            model.validate(),
            ValidationReport {
                valid: true,
                errors: vec![],
            }
        );
    }

    #[test]
    fn test_should_report_unset_partition_key_once() {
        let mut model = cookbook_model(memory_client());
        model.set("author", "dev@studiowebfx.com").unset("title");

        let report = model.validate();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("title"));
    }

    #[test]
    fn test_should_report_missing_required_attribute() {
        let mut model = cookbook_model(memory_client());
        model.set("author", "dev@studiowebfx.com").unset("summary");

        let report = model.validate();
        assert_eq!(report.errors, vec!["\"summary\" is required on CookbookModel"]);
    }

    #[test]
    fn test_should_report_type_errors_in_declaration_order() {
        let mut model = cookbook_model(memory_client());
        model.fill([
            ("author", json!("dev@studiowebfx.com")),
            ("image", json!("cover.png")),
            ("reviews", json!("many")),
        ]);
        let report = model.validate();
        assert_eq!(
            report.errors,
            vec![
                "\"image\" must be a string set",
                "\"reviews\" must be a number",
            ]
        );
    }

    #[test]
    fn test_should_report_undeclared_key_attribute() {
        let model = Model::new("RecipeModel", Arc::new(recipes_table()), memory_client());
        let report = model.validate();
        assert_eq!(
            report.errors,
            vec!["Partition key \"id\" is not defined in RecipeEntity"]
        );
    }

    #[tokio::test]
    async fn test_should_reject_invalid_model_before_saving() {
        let mut model = cookbook_model(FailingClient::shared());
        model.set("author", "dev@studiowebfx.com").unset("summary");
        let err = model.save().await.unwrap_err();
        assert!(matches!(err, DynormError::Validation { ref messages } if messages.len() == 1));
    }

    #[tokio::test]
    async fn test_should_save_and_find_model() {
        init_tracing();
        let (db, _) = seeded_db().await;
        let mut model = db.model("CookbookModel").unwrap();
        model.fill([
            ("title", json!("X")),
            ("author", json!("Y")),
            ("image", json!(["i.png"])),
        ]);
        model.save().await.unwrap();

        let found = model
            .find_by(KeyValues::new("X").with_sort_key("Y"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name(), "CookbookModel");
        assert_eq!(found.get("title").unwrap(), Some(&json!("X")));
        assert_eq!(found.get("author").unwrap(), Some(&json!("Y")));
        assert_eq!(found.get("image").unwrap(), Some(&json!(["i.png"])));
        assert_eq!(found.get("reviews").unwrap(), None);
    }

    #[tokio::test]
    async fn test_should_return_none_for_missing_record() {
        let (db, _) = seeded_db().await;
        let model = db.model("CookbookModel").unwrap();
        let found = model
            .find_by(KeyValues::new("Nope").with_sort_key("nobody"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_should_require_sort_key_to_find() {
        let (db, _) = seeded_db().await;
        let model = db.model("CookbookModel").unwrap();
        let err = model.find_by(KeyValues::new("Bay Breeze")).await.unwrap_err();
        assert!(matches!(
            err,
            DynormError::PrimaryKey(ref m)
                if m == "Failed to fetch item. Primary key requires partition key and sort key on CookbookModel"
        ));
    }

    #[tokio::test]
    async fn test_should_refresh_from_store() {
        let (db, _) = seeded_db().await;
        let mut model = db.model("CookbookModel").unwrap();
        model.fill([("title", "Bay Breeze"), ("author", "amy@example.com")]);
        model.set("summary", "stale");

        assert!(model.fresh().await.unwrap());
        assert_eq!(model.get("summary").unwrap(), Some(&json!("Coastal cooking")));

        model.set("author", "someone-else@example.com");
        assert!(!model.fresh().await.unwrap());

        model.unset("author");
        assert!(matches!(
            model.fresh().await.unwrap_err(),
            DynormError::PrimaryKey(_)
        ));
    }

    #[tokio::test]
    async fn test_should_delete_model() {
        let (db, _) = seeded_db().await;
        let mut model = db.model("CookbookModel").unwrap();
        model.fill([("title", "Bay Breeze"), ("author", "amy@example.com")]);

        assert!(model.delete().await.unwrap());
        assert!(!model.delete().await.unwrap());
        assert!(model.find().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_swallow_store_failure_on_delete() {
        init_tracing();
        let mut model = cookbook_model(FailingClient::shared());
        model.set("author", "dev@studiowebfx.com");
        assert!(!model.delete().await.unwrap());
    }

    #[tokio::test]
    async fn test_should_reject_mistyped_key_before_store_call() {
        let model = cookbook_model(FailingClient::shared());
        let key = KeyValues::new(json!(["Bay Breeze"])).with_sort_key("amy@example.com");

        let err = model.find_by(key.clone()).await.unwrap_err();
        assert!(matches!(err, DynormError::Marshal { ref attribute, .. } if attribute == "title"));
        let err = model.delete_by(key).await.unwrap_err();
        assert!(matches!(err, DynormError::Marshal { .. }));
    }

    #[tokio::test]
    async fn test_should_map_missing_table_on_save() {
        let client = memory_client();
        let mut model = cookbook_model(client);
        model.set("author", "dev@studiowebfx.com");
        let err = model.save().await.unwrap_err();
        assert!(matches!(
            err,
            DynormError::TableNotFound(ref m) if m == "dynamodb table does not exist \"Cookbooks\""
        ));
    }

    #[tokio::test]
    async fn test_should_map_other_failures_on_save() {
        let mut model = cookbook_model(FailingClient::shared());
        model.set("author", "dev@studiowebfx.com");
        let err = model.save().await.unwrap_err();
        assert!(matches!(
            err,
            DynormError::ServiceUnavailable(ref m)
                if m == "Failed to save dynamo model CookbookModel. store is down"
        ));

        let mut model = cookbook_model(FailingClient::with_error(|| {
            DynamoDBError::resource_not_found("gone").with_status(http::StatusCode::NOT_FOUND)
        }));
        model.set("author", "dev@studiowebfx.com");
        let err = model.save().await.unwrap_err();
        assert!(matches!(
            err,
            DynormError::TableNotFound(ref m)
                if m == "Failed to save dynamo model CookbookModel. gone"
        ));
    }

    #[tokio::test]
    async fn test_should_update_non_key_attributes() {
        let (db, client) = seeded_db().await;
        let mut model = db.model("CookbookModel").unwrap();
        model.fill([
            ("title", json!("Bay Breeze")),
            ("author", json!("amy@example.com")),
            ("summary", json!("Coastal cooking, revised")),
            ("reviews", json!(9)),
        ]);
        model.update().await.unwrap();

        assert_eq!(model.get("reviews").unwrap(), Some(&json!(9)));
        // Attributes the model did not set survive the update.
        assert_eq!(model.get("image").unwrap(), Some(&json!(["breeze.png"])));

        let stored = client
            .get_item(GetItemInput {
                table_name: "Cookbooks".to_owned(),
                key: cookbooks_table()
                    .to_input_key(&KeyValues::new("Bay Breeze").with_sort_key("amy@example.com"))
                    .unwrap(),
                consistent_read: None,
            })
            .await
            .unwrap()
            .item
            .unwrap();
        assert_eq!(
            stored["summary"],
            AttributeValue::S("Coastal cooking, revised".to_owned())
        );
    }

    #[test]
    fn test_should_build_placeholder_names() {
        assert_eq!(placeholder_name("socialMediaLinks"), "socialmedialinks");
        assert_eq!(placeholder_name("cover  image\turl"), "cover_image_url");
    }

    #[test]
    fn test_should_marshal_only_set_attributes() {
        let mut model = Model::new("CookbookEntity", Arc::new(cookbooks_table()), memory_client());
        model.fill([("title", json!("A")), ("reviews", json!(3))]);
        let item = model.to_item().unwrap();
        assert_eq!(item.len(), 2);
        assert_eq!(item["reviews"], AttributeValue::N("3".to_owned()));
    }
}
