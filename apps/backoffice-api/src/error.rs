//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Back Office                        │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                    │
//! │         │                                                               │
//! │         ├── DbError::NotFound ─────────────────────► 404 NOT_FOUND     │
//! │         ├── DbError::UniqueViolation / InUse ──────► 409 CONFLICT      │
//! │         ├── CoreError::Validation ─────────────────► 400 VALIDATION    │
//! │         ├── CoreError::PermissionDenied ───────────► 403 FORBIDDEN     │
//! │         ├── CoreError::{InsufficientStock, ...} ───► 422               │
//! │         └── anything else ─────────────────────────► 500               │
//! │                                                                         │
//! │  Response body:                                                         │
//! │    { "code": "NOT_FOUND", "message": "Salon not found: 42" }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use salon_core::{CoreError, ValidationError};
use salon_db::DbError;
use serde::Serialize;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CURRENCY_MISMATCH",
///   "message": "Cannot book GBP on a EUR cash register"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Missing or invalid credentials (401)
    Unauthorized,

    /// Authenticated but not allowed (403)
    Forbidden,

    /// Duplicate value (409)
    Conflict,

    /// Row still referenced (409)
    InUse,

    /// Not enough stock (422)
    InsufficientStock,

    /// Event currency cannot be booked on the register (422)
    CurrencyMismatch,

    /// Business rule violated (422)
    BusinessLogic,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict | ErrorCode::InUse => StatusCode::CONFLICT,
            ErrorCode::InsufficientStock
            | ErrorCode::CurrencyMismatch
            | ErrorCode::BusinessLogic => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            e @ DbError::InUse { .. } => ApiError::new(ErrorCode::InUse, e.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Rule(e) => ApiError::from(e),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) | CoreError::AmountOverflow { .. } => ErrorCode::ValidationError,
            CoreError::PermissionDenied(_) => ErrorCode::Forbidden,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::CurrencyMismatch { .. } => ErrorCode::CurrencyMismatch,
            CoreError::ForeignSalon { .. }
            | CoreError::ShaveNotCompleted { .. }
            | CoreError::SalonCycle { .. }
            | CoreError::OverlappingAssignment { .. }
            | CoreError::DefaultCurrencyLocked => ErrorCode::BusinessLogic,
        };
        let message = match err {
            CoreError::Validation(e) => e.to_string(),
            other => other.to_string(),
        };
        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_statuses() {
        let err = ApiError::from(DbError::not_found("Salon", "42"));
        assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Salon not found: 42");

        let err = ApiError::from(DbError::duplicate("code", "USD"));
        assert_eq!(err.code, ErrorCode::Conflict);

        let err = ApiError::from(DbError::QueryFailed("syntax error near SELECT".into()));
        assert_eq!(err.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("SELECT"));
    }

    #[test]
    fn test_core_errors_map_to_statuses() {
        let err = ApiError::from(DbError::Rule(CoreError::CurrencyMismatch {
            event_currency: "GBP".into(),
            register_currency: "EUR".into(),
        }));
        assert_eq!(err.code, ErrorCode::CurrencyMismatch);
        assert_eq!(err.code.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(CoreError::PermissionDenied("manage".into()));
        assert_eq!(err.code.status(), StatusCode::FORBIDDEN);

        let err = ApiError::from(CoreError::Validation(ValidationError::Required {
            field: "name".into(),
        }));
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "name is required");

        let err = ApiError::from(CoreError::AmountOverflow {
            what: "price × quantity".into(),
        });
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::not_found("Shave", "7")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Shave not found: 7");
    }
}
