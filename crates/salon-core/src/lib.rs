//! # salon-core: Pure Business Logic for the Salon Back Office
//!
//! This crate holds every rule of the back office that can be expressed
//! without touching a database or a socket.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Salon Back Office Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/backoffice-api (axum)                      │   │
//! │  │    routes ──► auth ──► permission gate ──► DTOs                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │permissions│  │   │
//! │  │   │   Salon   │  │   Money   │  │  Effect   │  │  Access   │  │   │
//! │  │   │   Shave   │  │ Exchange  │  │  Stock    │  │  resolve  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    salon-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, ledger transactions          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Salon, Barber, Shave, Item, ...)
//! - [`money`] - Money and ExchangeRate with integer arithmetic
//! - [`ledger`] - Cash register and stock effects of money events
//! - [`permissions`] - Hierarchical salon permission resolution
//! - [`validation`] - Field validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use salon_core::money::{convert_to_default, ExchangeRate, Money};
//!
//! // 10.00 EUR at 0.92 EUR per USD
//! let rate: ExchangeRate = "0.92".parse().unwrap();
//! let in_usd = convert_to_default(Money::from_cents(1000), rate, false).unwrap();
//! assert_eq!(in_usd.cents(), 1087);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod permissions;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{ExchangeRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Code of the currency created when no default currency exists yet.
pub const DEFAULT_CURRENCY_CODE: &str = "USD";

/// Display name of the fallback default currency.
pub const DEFAULT_CURRENCY_NAME: &str = "US Dollar";

/// Name of the payment type created on demand for salary payouts.
pub const DEFAULT_PAYMENT_TYPE: &str = "SALARY";

/// Page size used when a list request doesn't specify one.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Upper bound for `per_page` on list requests.
pub const MAX_PER_PAGE: i64 = 100;

/// Highest page number; keeps `(page - 1) * per_page` inside an i64.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;
