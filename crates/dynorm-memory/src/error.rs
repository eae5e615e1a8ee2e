//! Mapping of internal failures onto store errors.

use dynorm_model::error::DynamoDBError;

use crate::statement::StatementError;
use crate::storage::StorageError;

/// Convert a storage error into a `ValidationException`.
///
/// Takes `e` by value because it is used as a `.map_err()` argument.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn storage_error_to_dynamodb(e: StorageError) -> DynamoDBError {
    DynamoDBError::validation(e.to_string())
}

/// Convert a statement error into a `ValidationException`.
///
/// Takes `e` by value because it is used as a `.map_err()` argument.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn statement_error_to_dynamodb(e: StatementError) -> DynamoDBError {
    DynamoDBError::validation(e.to_string())
}
