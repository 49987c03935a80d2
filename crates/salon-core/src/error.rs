//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  salon-api errors (in app)                                             │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. They are raised before any row
/// is written, or inside a transaction that is then rolled back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough units of an item to record a usage or revert a purchase.
    ///
    /// ## When This Occurs
    /// ```text
    /// Item "Pomade" stock: 2
    ///      │
    ///      ▼
    /// Record usage (qty: 3)
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Pomade", available: 2, requested: 3 }
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// An event's currency cannot be booked on the chosen cash register.
    #[error("Cannot book {event_currency} on a {register_currency} cash register")]
    CurrencyMismatch {
        event_currency: String,
        register_currency: String,
    },

    /// A referenced record belongs to another salon.
    #[error("{entity} {id} does not belong to salon {salon_id}")]
    ForeignSalon {
        entity: String,
        id: String,
        salon_id: String,
    },

    /// Items may only be consumed by completed shaves.
    #[error("Items can only be used for completed shaves (shave {shave_id} is {status})")]
    ShaveNotCompleted { shave_id: String, status: String },

    /// Re-parenting would make a salon its own ancestor.
    #[error("Salon {salon_id} cannot be placed under its own descendant {parent_id}")]
    SalonCycle { salon_id: String, parent_id: String },

    /// Assignment date range overlaps an existing one.
    #[error("This assignment overlaps with an existing one ({existing_id})")]
    OverlappingAssignment { existing_id: String },

    /// The default currency cannot be deleted or demoted; promote another
    /// currency instead.
    #[error("The default currency cannot be deleted or demoted")]
    DefaultCurrencyLocked,

    /// A money computation left the range of an i64 cent count.
    #[error("Amount out of range while computing {what}")]
    AmountOverflow { what: String },

    /// The caller is not allowed to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet field requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed exchange rate).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Start of a period is after its end.
    #[error("{start_field} must be before {end_field}")]
    InvalidDateRange {
        start_field: String,
        end_field: String,
    },

    /// Duplicate value (e.g., second default currency).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
