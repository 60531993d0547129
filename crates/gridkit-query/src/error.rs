//! Error types for grid query processing.

use thiserror::Error;

/// Errors raised while planning or executing a grid request.
///
/// Filter compilation errors never reach the caller of
/// [`GridEngine::execute`](crate::GridEngine::execute): they are downgraded to
/// messages in [`DataSourceResult::errors`](crate::DataSourceResult) and the
/// request runs unfiltered. Every other variant aborts the request.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A dotted field path does not resolve on the record type.
    #[error("Property '{field}' not found in type '{record_type}'")]
    FieldNotFound {
        /// The path segment that failed to resolve.
        field: String,
        /// The record type the segment was looked up on.
        record_type: String,
    },

    /// Operator is unknown or not legal for the field's type.
    #[error("Operator '{operator}' is not supported for {data_type} fields")]
    UnsupportedOperator {
        /// Operator as written in the request.
        operator: String,
        /// Display name of the resolved field type.
        data_type: String,
    },

    /// Composite filter logic is neither `and` nor `or`.
    #[error("Unsupported filter logic '{0}' (expected 'and' or 'or')")]
    UnsupportedLogic(String),

    /// Composite filter has an empty `filters` list.
    #[error("Composite filter '{0}' has no child filters")]
    EmptyComposite(String),

    /// Aggregate name cannot be applied to the field's type.
    #[error("Aggregate '{aggregate}' cannot be applied to field '{field}'")]
    UnsupportedAggregate {
        /// Aggregate name as written in the request.
        aggregate: String,
        /// Field path the aggregate was requested on.
        field: String,
    },

    /// A literal or record value does not match the expected type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Description of the expected type.
        expected: String,
        /// Description of the value found.
        actual: String,
    },

    /// No record type with this name is registered in the schema.
    #[error("record type '{0}' is not registered")]
    RecordTypeNotFound(String),

    /// The record-collection provider failed (including numeric overflow).
    #[error("provider execution failed: {0}")]
    ProviderExecution(String),

    /// The caller cancelled an asynchronous execution.
    #[error("query execution was cancelled")]
    Cancelled,

    /// JSON decoding of a request or record set failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for grid query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
