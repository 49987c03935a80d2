//! # Salon Back Office API
//!
//! JSON HTTP API over salon-db.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Back Office API                                  │
//! │                                                                         │
//! │  Request ──► TraceLayer ──► Router ──► handler                         │
//! │                                          │                              │
//! │                ┌─────────────────────────┼──────────────────────┐       │
//! │                ▼                         ▼                      ▼       │
//! │          AuthUser (JWT)        permission gate         repository call  │
//! │          auth.rs               routes/mod.rs           salon-db         │
//! │                                (salon-core resolver)                    │
//! │                                                                         │
//! │  Errors: DbError / CoreError ──► ApiError ──► status + JSON body       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `SALON_DATABASE_PATH` - SQLite file (default: ./backoffice.db)
//! - `SALON_HTTP_PORT` - HTTP port (default: 8080)
//! - `SALON_JWT_SECRET` - Secret for JWT signing
//! - `SALON_JWT_LIFETIME_SECS` - Token lifetime (default: 3600)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use salon_db::Database;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;

use crate::auth::JwtManager;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}
