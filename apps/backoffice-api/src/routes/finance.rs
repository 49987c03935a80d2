//! Cash registers and the money events booked on them.
//!
//! Every route here requires `manage_finance` on the salon. Amounts travel
//! as integer cents; exchange rates as decimal strings (`"0.92"`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use salon_core::{CashRegister, Money, Page, Payment, PermissionKind, TransactionKind, Transalon};
use salon_db::{CashRegisterSummary, NewCashRegister, NewPayment, NewTransalon, PaymentFilter, TransalonFilter};
use serde::{Deserialize, Serialize};

use super::{authorize, exchange_rate, today, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/salons/{salon_id}/cash-registers",
            get(list_registers).post(create_register),
        )
        .route(
            "/api/salons/{salon_id}/cash-registers/{id}",
            get(get_register).patch(rename_register).delete(delete_register),
        )
        .route(
            "/api/salons/{salon_id}/cash-registers/{id}/summary",
            get(register_summary),
        )
        .route(
            "/api/salons/{salon_id}/payments",
            get(list_payments).post(create_payment),
        )
        .route(
            "/api/salons/{salon_id}/payments/{id}",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route(
            "/api/salons/{salon_id}/transactions",
            get(list_transalons).post(create_transalon),
        )
        .route(
            "/api/salons/{salon_id}/transactions/{id}",
            get(get_transalon)
                .put(update_transalon)
                .delete(delete_transalon),
        )
        .route("/api/salons/{salon_id}/revenue", get(revenue))
}

// =============================================================================
// Cash Registers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRegister {
    pub name: String,
    /// Defaults to the default currency.
    pub currency_id: Option<String>,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct RenameRegister {
    pub name: String,
}

async fn list_registers(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<NameQuery>,
) -> ApiResult<Json<Page<CashRegister>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let registers = state
        .db
        .cash_registers()
        .list(&salon_id, q.name.as_deref(), page.pagination()?)
        .await?;
    Ok(Json(registers))
}

async fn create_register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateRegister>,
) -> ApiResult<(StatusCode, Json<CashRegister>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let register = state
        .db
        .cash_registers()
        .create(
            &salon_id,
            NewCashRegister {
                name: req.name,
                currency_id: req.currency_id,
                opening_balance: Money::from_cents(req.opening_balance_cents),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(register)))
}

async fn get_register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<CashRegister>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(state.db.cash_registers().get(&salon_id, &id).await?))
}

/// Only the name is editable; the balance moves through bookings.
async fn rename_register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<RenameRegister>,
) -> ApiResult<Json<CashRegister>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(
        state.db.cash_registers().rename(&salon_id, &id, &req.name).await?,
    ))
}

async fn delete_register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    state.db.cash_registers().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn register_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<CashRegisterSummary>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(state.db.cash_registers().summary(&salon_id, &id).await?))
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub barber_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub barber_id: String,
    pub amount_cents: i64,
    pub currency_id: Option<String>,
    pub exchange_rate: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Defaults to the salary payment type.
    pub payment_type_id: Option<String>,
    pub cash_register_id: String,
    pub payment_date: Option<NaiveDate>,
}

impl PaymentRequest {
    fn into_new(self) -> ApiResult<NewPayment> {
        Ok(NewPayment {
            barber_id: self.barber_id,
            amount: Money::from_cents(self.amount_cents),
            currency_id: self.currency_id,
            exchange_rate: exchange_rate(self.exchange_rate.as_deref())?,
            start_date: self.start_date,
            end_date: self.end_date,
            payment_type_id: self.payment_type_id,
            cash_register_id: self.cash_register_id,
            payment_date: self.payment_date.unwrap_or_else(today),
        })
    }
}

async fn list_payments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<PaymentQuery>,
) -> ApiResult<Json<Page<Payment>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let filter = PaymentFilter {
        barber_id: q.barber_id,
        payment_type_id: q.payment_type_id,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let payments = state
        .db
        .payments()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(payments))
}

async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let payment = state.db.payments().create(&salon_id, req.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Payment>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(state.db.payments().get(&salon_id, &id).await?))
}

async fn update_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<Payment>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(
        state.db.payments().update(&salon_id, &id, req.into_new()?).await?,
    ))
}

async fn delete_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    state.db.payments().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Transalons
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TransalonQuery {
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TransalonRequest {
    pub name: String,
    pub amount_cents: i64,
    pub currency_id: Option<String>,
    pub exchange_rate: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub kind: TransactionKind,
    pub cash_register_id: String,
}

impl TransalonRequest {
    fn into_new(self) -> ApiResult<NewTransalon> {
        Ok(NewTransalon {
            name: self.name,
            amount: Money::from_cents(self.amount_cents),
            currency_id: self.currency_id,
            exchange_rate: exchange_rate(self.exchange_rate.as_deref())?,
            transaction_date: self.transaction_date.unwrap_or_else(today),
            kind: self.kind,
            cash_register_id: self.cash_register_id,
        })
    }
}

async fn list_transalons(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<TransalonQuery>,
) -> ApiResult<Json<Page<Transalon>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let filter = TransalonFilter {
        name: q.name,
        kind: q.kind,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let transalons = state
        .db
        .transalons()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(transalons))
}

async fn create_transalon(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<TransalonRequest>,
) -> ApiResult<(StatusCode, Json<Transalon>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let transalon = state.db.transalons().create(&salon_id, req.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(transalon)))
}

async fn get_transalon(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Transalon>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(state.db.transalons().get(&salon_id, &id).await?))
}

async fn update_transalon(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<TransalonRequest>,
) -> ApiResult<Json<Transalon>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    Ok(Json(
        state.db.transalons().update(&salon_id, &id, req.into_new()?).await?,
    ))
}

async fn delete_transalon(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    state.db.transalons().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Revenue
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Completed shave revenue in the default currency.
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub salon_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub revenue_cents: i64,
}

async fn revenue(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(q): Query<RevenueQuery>,
) -> ApiResult<Json<RevenueResponse>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageFinance).await?;
    let revenue = state
        .db
        .shaves()
        .revenue(&salon_id, q.start_date, q.end_date)
        .await?;
    Ok(Json(RevenueResponse {
        salon_id,
        start_date: q.start_date,
        end_date: q.end_date,
        revenue_cents: revenue.cents(),
    }))
}
