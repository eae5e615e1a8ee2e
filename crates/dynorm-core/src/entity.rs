//! Entities: named, ordered attribute schemas.

use crate::attribute::{AttributeDefinition, AttributeType};
use crate::error::{DynormError, DynormResult};

/// The attribute schema of one record shape.
///
/// Attribute order is declaration order and is preserved everywhere the
/// schema is iterated (validation, marshalling, query results).
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    attributes: Vec<(String, AttributeDefinition)>,
}

impl Entity {
    /// Start declaring an entity.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeDefinition)> {
        self.attributes.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Look up an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find_map(|(n, d)| (n == name).then_some(d))
    }

    /// Whether `name` is a declared attribute.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    pub(crate) fn definitions(&self) -> &[(String, AttributeDefinition)] {
        &self.attributes
    }
}

/// Builder for [`Entity`].
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    attributes: Vec<(String, AttributeDefinition)>,
}

impl EntityBuilder {
    /// Declare an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, definition: AttributeDefinition) -> Self {
        self.attributes.push((name.into(), definition));
        self
    }

    /// Declare an optional attribute without a default.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attribute(name, AttributeDefinition::new(attribute_type))
    }

    /// Declare a required attribute without a default.
    #[must_use]
    pub fn required(self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attribute(name, AttributeDefinition::new(attribute_type).required())
    }

    /// Finish the entity.
    ///
    /// # Errors
    ///
    /// Returns [`DynormError::Config`] when an attribute is declared twice or
    /// a default value does not match its type.
    pub fn build(self) -> DynormResult<Entity> {
        for (index, (name, definition)) in self.attributes.iter().enumerate() {
            if self.attributes[..index].iter().any(|(n, _)| n == name) {
                return Err(DynormError::Config(format!(
                    "attribute \"{name}\" declared twice on {}",
                    self.name
                )));
            }
            if let Some(value) = &definition.value {
                definition.validate(value).map_err(|e| {
                    DynormError::Config(format!(
                        "default of \"{name}\" on {} must be a {e}",
                        self.name
                    ))
                })?;
            }
        }

        Ok(Entity {
            name: self.name,
            attributes: self.attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_keep_declaration_order() {
        let entity = Entity::builder("AuthorEntity")
            .optional("firstName", AttributeType::String)
            .optional("lastName", AttributeType::String)
            .required("email", AttributeType::String)
            .build()
            .unwrap();

        let names: Vec<_> = entity.attribute_names().collect();
        assert_eq!(names, ["firstName", "lastName", "email"]);
        assert!(entity.attribute("email").unwrap().required);
        assert!(!entity.has_attribute("about"));
    }

    #[test]
    fn test_should_reject_duplicate_attribute() {
        let err = Entity::builder("AuthorEntity")
            .optional("email", AttributeType::String)
            .optional("email", AttributeType::String)
            .build()
            .unwrap_err();
        assert!(matches!(err, DynormError::Config(ref m) if m.contains("\"email\"")));
    }

    #[test]
    fn test_should_reject_default_of_wrong_type() {
        let err = Entity::builder("CookbookEntity")
            .attribute(
                "reviews",
                AttributeDefinition::new(AttributeType::Number).with_default("five"),
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must be a number"));

        let entity = Entity::builder("CookbookEntity")
            .attribute(
                "reviews",
                AttributeDefinition::new(AttributeType::Number).with_default(0),
            )
            .build()
            .unwrap();
        assert_eq!(entity.attribute("reviews").unwrap().value, Some(json!(0)));
    }
}
