//! # Error Types
//!
//! Domain-specific error types for karat-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  karat-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  karat-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  karat-engine errors                                                    │
//! │  └── ApiError         - What callers see (serialized outcome)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity, ID, amount)
//! 3. Errors are enum variants, never String
//! 4. Every failure is raised at the point of detection and surfaces
//!    unchanged to the caller - no internal retries

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These mirror the engine's error taxonomy: validation, not-found,
/// state conflicts, layaway misuse, and invalid payment amounts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record (inventory item, sale, ticket) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The record is in a state that forbids the requested operation.
    ///
    /// ## When This Occurs
    /// - Refunding an already-refunded sale ("already refunded")
    /// - Cancelling a cancelled/void gold-buy ticket
    /// - Updating a paid/posted/cancelled gold-buy ticket ("cannot be modified")
    #[error("{message}")]
    StateConflict { message: String },

    /// Payments can only be added to layaway sales.
    #[error("Sale {sale_id} is not a layaway")]
    NotLayaway { sale_id: String },

    /// Payment amount must be positive.
    #[error("Invalid payment amount: {cents} cents")]
    InvalidAmount { cents: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a StateConflict error.
    pub fn state_conflict(message: impl Into<String>) -> Self {
        CoreError::StateConflict {
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A required collection is empty (e.g. sale with no items).
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, purity above 1.0).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
