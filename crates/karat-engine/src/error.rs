//! # Engine Error Types
//!
//! What callers of the engine see: a machine-readable code plus a
//! human-readable message, and the `ApiResponse` envelope that carries
//! either data or an error.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ─┐                                                     │
//! │  CoreError ───────┼──► ApiError { code, message } ──► ApiResponse<T>    │
//! │  DbError ─────────┘                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use karat_core::{CoreError, ValidationError};
use karat_db::DbError;

// =============================================================================
// Error Code
// =============================================================================

/// Machine-readable error category, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    StateConflict,
    NotLayaway,
    InvalidAmount,
    DatabaseError,
    Internal,
}

// =============================================================================
// Api Error
// =============================================================================

/// The engine's outward-facing error.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{entity} not found: {id}"))
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::StateConflict, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::StateConflict { .. } => ErrorCode::StateConflict,
            CoreError::NotLayaway { .. } => ErrorCode::NotLayaway,
            CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(CoreError::from(err))
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            // Guarded updates that matched no rows surface as state conflicts
            DbError::Conflict { .. } => ApiError::new(ErrorCode::StateConflict, err.to_string()),
            DbError::UniqueViolation { .. } => {
                ApiError::new(ErrorCode::StateConflict, err.to_string())
            }
            _ => ApiError::new(ErrorCode::DatabaseError, err.to_string()),
        }
    }
}

/// Result type for engine operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Response Envelope
// =============================================================================

/// Serialized outcome envelope for engine operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Successful outcome with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Failed outcome carrying the error.
    pub fn err(error: ApiError) -> Self {
        ApiResponse {
            success: false,
            message: error.message.clone(),
            data: None,
            error: Some(error),
        }
    }
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok("ok", data),
            Err(error) => ApiResponse::err(error),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err = ApiError::from(CoreError::not_found("Sale", "abc"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Sale not found: abc");

        let err = ApiError::from(CoreError::NotLayaway {
            sale_id: "abc".to_string(),
        });
        assert_eq!(err.code, ErrorCode::NotLayaway);

        let err = ApiError::from(CoreError::InvalidAmount { cents: -5 });
        assert_eq!(err.code, ErrorCode::InvalidAmount);
    }

    #[test]
    fn test_db_conflict_maps_to_state_conflict() {
        let err = ApiError::from(DbError::conflict("Sale already refunded"));
        assert_eq!(err.code, ErrorCode::StateConflict);
        assert!(err.message.contains("already refunded"));
    }

    #[test]
    fn test_response_envelope() {
        let ok: ApiResponse<i32> = ApiResponse::ok("created", 7);
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));

        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("\"error\""));

        let err: ApiResponse<i32> =
            ApiResponse::err(ApiError::state_conflict("Gold buy cannot be modified"));
        assert!(!err.success);
        assert!(err.message.contains("cannot be modified"));
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::StateConflict).unwrap();
        assert_eq!(json, "\"STATE_CONFLICT\"");
    }
}
