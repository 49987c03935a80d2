//! # HTTP Routes
//!
//! One module per area of the back office. Salon-scoped routes live under
//! `/api/salons/{salon_id}/...` and pass a permission gate before touching
//! the repositories.
//!
//! ## Permission Gates
//! ```text
//! handler(salon_id, AuthUser)
//!    │
//!    ▼
//! db.salons().access_facts(user, salon)   lineage + grants + assignments
//!    │
//!    ▼
//! facts.context(user, today).require(kind)  ──► Err ──► 403 FORBIDDEN
//!    │ Ok
//!    ▼
//! repository call
//! ```

pub mod finance;
pub mod health;
pub mod inventory;
pub mod reference;
pub mod salons;
pub mod services;
pub mod staff;
pub mod users;

use axum::Router;
use chrono::{NaiveDate, Utc};
use salon_core::validation::validate_pagination;
use salon_core::{ExchangeRate, Pagination, PermissionKind, User};
use salon_db::AccessFacts;
use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Builds the complete API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(reference::routes())
        .merge(salons::routes())
        .merge(staff::routes())
        .merge(finance::routes())
        .merge(services::routes())
        .merge(inventory::routes())
        .with_state(state)
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// `?page=&per_page=` of every list route.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Result<Pagination, ApiError> {
        Ok(validate_pagination(self.page, self.per_page)?)
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Loads the user's access facts for a salon (404 for unknown salons).
pub(crate) async fn access(state: &AppState, user: &User, salon_id: &str) -> Result<AccessFacts, ApiError> {
    Ok(state.db.salons().access_facts(&user.id, salon_id).await?)
}

/// Requires `kind` on the salon.
pub(crate) async fn authorize(
    state: &AppState,
    user: &User,
    salon_id: &str,
    kind: PermissionKind,
) -> Result<(), ApiError> {
    let facts = access(state, user, salon_id).await?;
    if let Err(e) = facts.context(user, today()).require(kind) {
        warn!(user_id = %user.id, salon_id = %salon_id, permission = kind.as_str(), "Access denied");
        return Err(e.into());
    }
    Ok(())
}

/// Parses a decimal exchange rate such as `"0.92"`; absent means 1.
pub(crate) fn exchange_rate(raw: Option<&str>) -> Result<ExchangeRate, ApiError> {
    match raw {
        Some(s) => Ok(s.parse::<ExchangeRate>()?),
        None => Ok(ExchangeRate::one()),
    }
}
