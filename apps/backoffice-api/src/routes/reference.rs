//! Global reference data: currencies, payment types, barber types.
//!
//! Any signed-in user may read; writes need a staff member or superuser.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use salon_core::permissions::require_staff;
use salon_core::{BarberType, Currency, Page, PaymentType};
use salon_db::{CurrencyFilter, CurrencyUpdate};
use serde::Deserialize;

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/currencies", get(list_currencies).post(create_currency))
        .route(
            "/api/currencies/{id}",
            get(get_currency).patch(update_currency).delete(delete_currency),
        )
        .route("/api/payment-types", get(list_payment_types).post(create_payment_type))
        .route(
            "/api/payment-types/{id}",
            get(get_payment_type)
                .patch(update_payment_type)
                .delete(delete_payment_type),
        )
        .route("/api/barber-types", get(list_barber_types).post(create_barber_type))
}

// =============================================================================
// Currencies
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CurrencyQuery {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCurrency {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCurrency {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_default: Option<bool>,
}

async fn list_currencies(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(page): Query<PageQuery>,
    Query(q): Query<CurrencyQuery>,
) -> ApiResult<Json<Page<Currency>>> {
    let filter = CurrencyFilter {
        code: q.code,
        name: q.name,
        is_default: q.is_default,
    };
    Ok(Json(state.db.currencies().list(&filter, page.pagination()?).await?))
}

async fn create_currency(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateCurrency>,
) -> ApiResult<(StatusCode, Json<Currency>)> {
    require_staff(&user)?;
    let currency = state
        .db
        .currencies()
        .create(&req.code, &req.name, req.is_default)
        .await?;
    Ok((StatusCode::CREATED, Json(currency)))
}

async fn get_currency(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Currency>> {
    Ok(Json(state.db.currencies().get_by_id(&id).await?))
}

async fn update_currency(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateCurrency>,
) -> ApiResult<Json<Currency>> {
    require_staff(&user)?;
    let update = CurrencyUpdate {
        code: req.code,
        name: req.name,
        is_default: req.is_default,
    };
    Ok(Json(state.db.currencies().update(&id, update).await?))
}

async fn delete_currency(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_staff(&user)?;
    state.db.currencies().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Payment Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNamed {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePaymentType {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

async fn list_payment_types(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(page): Query<PageQuery>,
    Query(search): Query<SearchQuery>,
) -> ApiResult<Json<Page<PaymentType>>> {
    let types = state
        .db
        .payment_types()
        .list(search.q.as_deref(), page.pagination()?)
        .await?;
    Ok(Json(types))
}

async fn create_payment_type(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateNamed>,
) -> ApiResult<(StatusCode, Json<PaymentType>)> {
    require_staff(&user)?;
    let created = state
        .db
        .payment_types()
        .create(&req.name, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_payment_type(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PaymentType>> {
    Ok(Json(state.db.payment_types().get_by_id(&id).await?))
}

async fn update_payment_type(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePaymentType>,
) -> ApiResult<Json<PaymentType>> {
    require_staff(&user)?;
    let updated = state
        .db
        .payment_types()
        .update(
            &id,
            req.name.as_deref(),
            req.description.as_deref(),
            req.is_active,
        )
        .await?;
    Ok(Json(updated))
}

async fn delete_payment_type(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_staff(&user)?;
    state.db.payment_types().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Barber Types
// =============================================================================

async fn list_barber_types(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<BarberType>>> {
    Ok(Json(state.db.barber_types().list(page.pagination()?).await?))
}

async fn create_barber_type(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateNamed>,
) -> ApiResult<(StatusCode, Json<BarberType>)> {
    require_staff(&user)?;
    let created = state
        .db
        .barber_types()
        .create(&req.name, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
