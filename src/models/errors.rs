use rust_decimal::Decimal;
use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Menu item not found: {id}")]
    MenuItemNotFound { id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: RepositoryError,
    },
}

/// Store-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Timeout occurred during operation")]
    Timeout,
}

/// Validation errors for caller input. The display strings are the
/// user-visible `error` summaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid or missing 'name'")]
    InvalidOrMissingName,

    #[error("Invalid or missing 'price'")]
    InvalidOrMissingPrice,

    #[error("Invalid '{field}' value")]
    InvalidValue { field: String },

    #[error("Unrecognized field '{field}'")]
    UnrecognizedField { field: String },

    /// A non-negative number too large to store. `summary` is the usual
    /// price error of the operation that rejected it.
    #[error("{summary}")]
    PriceOutOfRange { summary: String },
}

impl ValidationError {
    /// Extra context for the response body, when there is any
    pub fn details(&self) -> Option<String> {
        match self {
            Self::PriceOutOfRange { .. } => {
                Some(format!("'price' must not exceed {}", Decimal::MAX))
            }
            _ => None,
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
