//! # salon-db: Database Layer for the Salon Back Office
//!
//! SQLite storage through sqlx. Every write that moves money or stock runs
//! inside one transaction together with its balance or stock update.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Back Office Data Flow                            │
//! │                                                                         │
//! │  axum handler (POST /api/salons/{id}/shaves)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     salon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SalonRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ShaveRepo     │    │ 001_initial  │  │   │
//! │  │   │               │    │ PaymentRepo   │    │ ...          │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ rules                          │   │
//! │  │                                ▼                                │   │
//! │  │                       salon-core (ledger, permissions)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (SALON_DATABASE_PATH)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use salon_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("backoffice.db")).await?;
//! let usd = db.currencies().default().await?;
//! let page = db.shaves().list(&salon_id, &ShaveFilter::default(), Pagination::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::assignment::{AssignmentRepository, AssignmentUpdate, NewAssignment};
pub use repository::barber::{BarberFilter, BarberRepository, BarberUpdate, NewBarber};
pub use repository::barber_type::BarberTypeRepository;
pub use repository::cash_register::{CashRegisterRepository, CashRegisterSummary, NewCashRegister};
pub use repository::client::{ClientFilter, ClientRepository, NewClient};
pub use repository::currency::{CurrencyFilter, CurrencyRepository, CurrencyUpdate};
pub use repository::hairstyle::{HairstyleRepository, HairstyleUpdate, NewHairstyle, TariffFilter};
pub use repository::item::{ItemFilter, ItemRepository, NewItem};
pub use repository::item_purchase::{ItemPurchaseFilter, ItemPurchaseRepository, NewItemPurchase};
pub use repository::item_usage::{ItemUsageFilter, ItemUsageRepository, NewItemUsage};
pub use repository::payment::{NewPayment, PaymentFilter, PaymentRepository};
pub use repository::payment_type::PaymentTypeRepository;
pub use repository::salon::{AccessFacts, NewSalon, SalonRepository, SalonUpdate};
pub use repository::shave::{NewShave, ShaveFilter, ShaveRepository, ShaveSummary};
pub use repository::transalon::{NewTransalon, TransalonFilter, TransalonRepository};
pub use repository::user::{NewUser, UserFilter, UserRepository};
