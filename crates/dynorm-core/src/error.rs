//! Error types for the mapping layer.

use dynorm_model::error::DynamoDBError;

use crate::attribute::AttributeTypeError;

/// Every failure the mapping layer reports.
#[derive(Debug, thiserror::Error)]
pub enum DynormError {
    /// The declared schema is inconsistent. Raised while building the
    /// registry, never at request time.
    #[error("configuration error: {0}")]
    Config(String),

    /// A key component required by the operation is missing.
    #[error("{0}")]
    PrimaryKey(String),

    /// The store reported the target table missing during a write.
    #[error("{0}")]
    TableNotFound(String),

    /// Any other store failure during a write.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Query builder misuse.
    #[error("{0}")]
    Query(String),

    /// Aggregated failures from [`Model::validate`](crate::Model::validate).
    #[error("validation failed: {}", messages.join("; "))]
    Validation {
        /// One message per failed check, in check order.
        messages: Vec<String>,
    },

    /// A validated assignment did not fit the attribute type.
    #[error(transparent)]
    Type(#[from] AttributeTypeError),

    /// The attribute is not declared on the entity.
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    /// The table could not be created.
    #[error("{0}")]
    CreateTable(String),

    /// A value cannot be written under its declared storage type.
    #[error("cannot marshal \"{attribute}\" as {attribute_type}: {reason}")]
    Marshal {
        /// Attribute name.
        attribute: String,
        /// Declared storage tag.
        attribute_type: &'static str,
        /// What was wrong with the value.
        reason: String,
    },

    /// A store call failed.
    #[error(transparent)]
    Store(#[from] DynamoDBError),
}

/// Convenience result type for mapping-layer operations.
pub type DynormResult<T> = Result<T, DynormError>;

impl DynormError {
    /// Validation messages, empty for every other variant.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation { messages } => messages,
            _ => &[],
        }
    }
}
