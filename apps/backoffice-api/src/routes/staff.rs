//! People attached to a salon: barber assignments, barbers, clients.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use salon_core::{Barber, Client, Page, PermissionKind, SalonAssignment};
use salon_db::{AssignmentUpdate, BarberFilter, BarberUpdate, ClientFilter, NewAssignment, NewBarber, NewClient};
use serde::Deserialize;

use super::{authorize, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/salons/{salon_id}/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route(
            "/api/salons/{salon_id}/assignments/{id}",
            get(get_assignment)
                .patch(update_assignment)
                .delete(delete_assignment),
        )
        .route(
            "/api/salons/{salon_id}/barbers",
            get(list_barbers).post(create_barber),
        )
        .route(
            "/api/salons/{salon_id}/barbers/{id}",
            get(get_barber).patch(update_barber).delete(delete_barber),
        )
        .route(
            "/api/salons/{salon_id}/clients",
            get(list_clients).post(create_client),
        )
        .route(
            "/api/salons/{salon_id}/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
}

// =============================================================================
// Assignments
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAssignment {
    pub barber_user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAssignment {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

async fn list_assignments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<SalonAssignment>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    let assignments = state
        .db
        .assignments()
        .list(&salon_id, page.pagination()?)
        .await?;
    Ok(Json(assignments))
}

async fn create_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateAssignment>,
) -> ApiResult<(StatusCode, Json<SalonAssignment>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    let assignment = state
        .db
        .assignments()
        .create(
            &salon_id,
            NewAssignment {
                barber_user_id: req.barber_user_id,
                start_date: req.start_date,
                end_date: req.end_date,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn get_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<SalonAssignment>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    Ok(Json(state.db.assignments().get(&salon_id, &id).await?))
}

async fn update_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<UpdateAssignment>,
) -> ApiResult<Json<SalonAssignment>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    let update = AssignmentUpdate {
        start_date: req.start_date,
        end_date: req.end_date,
        is_active: req.is_active,
    };
    Ok(Json(state.db.assignments().update(&salon_id, &id, update).await?))
}

async fn delete_assignment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    state.db.assignments().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Barbers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct BarberQuery {
    pub barber_type_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBarber {
    pub user_id: String,
    pub barber_type_id: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBarber {
    pub barber_type_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

async fn list_barbers(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<BarberQuery>,
) -> ApiResult<Json<Page<Barber>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    let filter = BarberFilter {
        barber_type_id: q.barber_type_id,
        user_id: q.user_id,
    };
    let barbers = state
        .db
        .barbers()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(barbers))
}

async fn create_barber(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateBarber>,
) -> ApiResult<(StatusCode, Json<Barber>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    let barber = state
        .db
        .barbers()
        .create(
            &salon_id,
            NewBarber {
                user_id: req.user_id,
                barber_type_id: req.barber_type_id,
                address: req.address,
                phone: req.phone,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(barber)))
}

async fn get_barber(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Barber>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    Ok(Json(state.db.barbers().get(&salon_id, &id).await?))
}

async fn update_barber(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<UpdateBarber>,
) -> ApiResult<Json<Barber>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    let update = BarberUpdate {
        barber_type_id: req.barber_type_id,
        address: req.address,
        phone: req.phone,
    };
    Ok(Json(state.db.barbers().update(&salon_id, &id, update).await?))
}

async fn delete_barber(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageBarbers).await?;
    state.db.barbers().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Clients
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ClientQuery {
    pub user_id: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub user_id: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClient {
    pub address: Option<String>,
    pub phone: Option<String>,
}

async fn list_clients(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(page): Query<PageQuery>,
    Query(q): Query<ClientQuery>,
) -> ApiResult<Json<Page<Client>>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    let filter = ClientFilter {
        user_id: q.user_id,
        phone: q.phone,
    };
    let clients = state
        .db
        .clients()
        .list(&salon_id, &filter, page.pagination()?)
        .await?;
    Ok(Json(clients))
}

async fn create_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<CreateClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    let client = state
        .db
        .clients()
        .create(
            &salon_id,
            NewClient {
                user_id: req.user_id,
                address: req.address,
                phone: req.phone,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn get_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Client>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    Ok(Json(state.db.clients().get(&salon_id, &id).await?))
}

async fn update_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
    Json(req): Json<UpdateClient>,
) -> ApiResult<Json<Client>> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    let client = state
        .db
        .clients()
        .update(&salon_id, &id, req.address.as_deref(), req.phone.as_deref())
        .await?;
    Ok(Json(client))
}

async fn delete_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((salon_id, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::ManageShave).await?;
    state.db.clients().delete(&salon_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
