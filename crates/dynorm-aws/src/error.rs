//! Mapping of SDK failures onto [`DynamoDBError`].

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;

use dynorm_model::error::{DynamoDBError, DynamoDBErrorCode};

/// Convert an SDK error, keeping the service code and the HTTP status.
///
/// Failures that never produced a response (connection refused, timeouts)
/// become `TransportError`.
pub fn sdk_error_to_dynamodb<E>(err: SdkError<E, HttpResponse>) -> DynamoDBError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err
        .raw_response()
        .and_then(|r| http::StatusCode::from_u16(r.status().as_u16()).ok());

    let error = match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            DynamoDBError::transport(format!("failed to reach DynamoDB: {err}"))
        }
        _ => {
            let code = err
                .code()
                .map_or(DynamoDBErrorCode::Unknown, DynamoDBErrorCode::from_code);
            let message = err
                .message()
                .map_or_else(|| err.to_string(), ToOwned::to_owned);
            DynamoDBError::with_message(code, message)
        }
    };

    let error = match status {
        Some(status) => error.with_status(status),
        None => error,
    };
    error.with_source(err)
}
