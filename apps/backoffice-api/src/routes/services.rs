//! Hairstyles, their tariff history, and shaves.
//!
//! Reads need `read`; writes need `manage_hairstyle` for the catalogue and
//! `manage_shave` for shaves.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use salon_core::{Hairstyle, HairstyleTariff, Money, Page, PermissionKind, Shave, ShaveStatus};
use salon_db::{HairstyleUpdate, NewHairstyle, NewShave, ShaveFilter, ShaveSummary, TariffFilter};
use serde::{Deserialize, Serialize};

use super::{authorize, exchange_rate, today, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/salons/{salon_id}/hairstyles",
            get(list_hairstyles).post(create_hairstyle),
        )
        .route(
            "/api/salons/{salon_id}/hairstyles/{id}",
            get(get_hairstyle)
                .patch(update_hairstyle)
                .delete(delete_hairstyle),
        )
        .route(
            "/api/salons/{salon_id}/hairstyles/{id}/tariff",
            get(tariff_at),
        )
        .route(
            "/api/salons/{salon_id}/tariff-history",
            get(tariff_history).post(add_tariff),
        )
        .route(
            "/api/salons/{salon_id}/shaves",
            get(list_shaves).post(create_shave),
        )
        .route(
            "/api/salons/{salon_id}/shaves/{id}",
            get(get_shave).put(update_shave).delete(delete_shave),
        )
        .route("/api/salons/{salon_id}/shaves/{id}/summary", get(shave_summary))
}

// =============================================================================
// Hairstyles
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHairstyle {
    pub name: String,
    pub current_tariff_cents: i64,
    pub currency_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateHairstyle {
    pub name: Option<String>,
    pub current_tariff_cents: Option<i64>,
    pub currency_id: Option<String>,
}

async fn list_hairstyles(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<NameQuery>,
) -> ApiResult<Json<Page<Hairstyle>>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    let hairstyles = state
        .db
        .hairstyles()
        .list(&salon_id, q.name.as_deref(), page.pagination()?)
        .await?;
    Ok(Json(hairstyles))
}

async fn create_hairstyle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateHairstyle>,
) -> ApiResult<(StatusCode, Json<Hairstyle>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageHairstyle).await?;
    let hairstyle = state
        .db
        .hairstyles()
        .create(
            &salon_id,
            NewHairstyle {
                name: req.name,
                current_tariff: Money::from_cents(req.current_tariff_cents),
                currency_id: req.currency_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(hairstyle)))
}

async fn get_hairstyle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Hairstyle>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    Ok(Json(state.db.hairstyles().get(&salon_id, &id).await?))
}

/// A tariff change is also recorded in the history.
async fn update_hairstyle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<UpdateHairstyle>,
) -> ApiResult<Json<Hairstyle>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageHairstyle).await?;
    let update = HairstyleUpdate {
        name: req.name,
        current_tariff: req.current_tariff_cents.map(Money::from_cents),
        currency_id: req.currency_id,
    };
    Ok(Json(state.db.hairstyles().update(&salon_id, &id, update).await?))
}

async fn delete_hairstyle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageHairstyle).await?;
    state.db.hairstyles().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Tariffs
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AtQuery {
    /// RFC 3339 instant; defaults to now.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TariffResponse {
    pub hairstyle_id: String,
    pub at: DateTime<Utc>,
    pub tariff_cents: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TariffQuery {
    pub hairstyle_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AddTariff {
    pub hairstyle_id: String,
    pub tariff_cents: i64,
    pub effective_at: Option<DateTime<Utc>>,
}

async fn tariff_at(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Query(q): Query<AtQuery>,
) -> ApiResult<Json<TariffResponse>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    let at = q.at.unwrap_or_else(Utc::now);
    let tariff = state.db.hairstyles().tariff_at(&salon_id, &id, at).await?;
    Ok(Json(TariffResponse {
        hairstyle_id: id,
        at,
        tariff_cents: tariff.cents(),
    }))
}

async fn tariff_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<TariffQuery>,
) -> ApiResult<Json<Page<HairstyleTariff>>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    let filter = TariffFilter {
        hairstyle_id: q.hairstyle_id,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let history = state
        .db
        .hairstyles()
        .tariff_history(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(history))
}

async fn add_tariff(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<AddTariff>,
) -> ApiResult<(StatusCode, Json<HairstyleTariff>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageHairstyle).await?;
    let entry = state
        .db
        .hairstyles()
        .add_tariff(
            &salon_id,
            &req.hairstyle_id,
            Money::from_cents(req.tariff_cents),
            req.effective_at.unwrap_or_else(Utc::now),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// =============================================================================
// Shaves
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ShaveQuery {
    pub barber_id: Option<String>,
    pub hairstyle_id: Option<String>,
    pub client_id: Option<String>,
    pub status: Option<ShaveStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ShaveRequest {
    pub barber_id: String,
    pub hairstyle_id: String,
    /// Defaults to the hairstyle's current tariff.
    pub amount_cents: Option<i64>,
    pub currency_id: Option<String>,
    pub exchange_rate: Option<String>,
    pub client_id: Option<String>,
    pub cash_register_id: String,
    pub shave_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ShaveStatus,
}

impl ShaveRequest {
    fn into_new(self) -> ApiResult<NewShave> {
        Ok(NewShave {
            barber_id: self.barber_id,
            hairstyle_id: self.hairstyle_id,
            amount: self.amount_cents.map(Money::from_cents),
            currency_id: self.currency_id,
            exchange_rate: exchange_rate(self.exchange_rate.as_deref())?,
            client_id: self.client_id,
            cash_register_id: self.cash_register_id,
            shave_date: self.shave_date.unwrap_or_else(today),
            status: self.status,
        })
    }
}

async fn list_shaves(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<ShaveQuery>,
) -> ApiResult<Json<Page<Shave>>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    let filter = ShaveFilter {
        barber_id: q.barber_id,
        hairstyle_id: q.hairstyle_id,
        client_id: q.client_id,
        status: q.status,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let shaves = state
        .db
        .shaves()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(shaves))
}

async fn create_shave(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<ShaveRequest>,
) -> ApiResult<(StatusCode, Json<Shave>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    let shave = state.db.shaves().create(&salon_id, req.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(shave)))
}

async fn get_shave(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Shave>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    Ok(Json(state.db.shaves().get(&salon_id, &id).await?))
}

async fn update_shave(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<ShaveRequest>,
) -> ApiResult<Json<Shave>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    Ok(Json(
        state.db.shaves().update(&salon_id, &id, req.into_new()?).await?,
    ))
}

async fn delete_shave(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    state.db.shaves().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn shave_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<ShaveSummary>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    Ok(Json(state.db.shaves().summary(&salon_id, &id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shave_request_defaults_to_scheduled_today() {
        let req: ShaveRequest = serde_json::from_str(
            r#"{"barber_id":"b1","hairstyle_id":"h1","cash_register_id":"r1"}"#,
        )
        .unwrap();
        let new = req.into_new().unwrap();
        assert_eq!(new.status, ShaveStatus::Scheduled);
        assert_eq!(new.shave_date, today());
        assert!(new.amount.is_none());
    }

    #[test]
    fn test_shave_request_status_names() {
        let req: ShaveRequest = serde_json::from_str(
            r#"{"barber_id":"b1","hairstyle_id":"h1","cash_register_id":"r1",
                "status":"in_progress","amount_cents":2500,"exchange_rate":"1.5"}"#,
        )
        .unwrap();
        let new = req.into_new().unwrap();
        assert_eq!(new.status, ShaveStatus::InProgress);
        assert_eq!(new.amount, Some(Money::from_cents(2500)));
        assert_eq!(new.exchange_rate.micros(), 1_500_000);
    }
}
