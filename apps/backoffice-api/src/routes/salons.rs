//! Salon tree and explicit permission grants.
//!
//! ```text
//! POST   /api/salons                      root: any user, child: manage on parent
//! PATCH  /api/salons/{id}                 manage (+ superuser to move)
//! DELETE /api/salons/{id}                 owner of the salon or an ancestor
//! */api/salons/{id}/permissions           manage
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use salon_core::permissions::{require_can_reparent, require_superuser};
use salon_core::{Page, PermissionKind, Salon, SalonPermission};
use salon_db::{NewSalon, SalonUpdate};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use super::{access, authorize, today, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/salons", get(list).post(create))
        .route("/api/salons/{salon_id}", get(show).patch(update).delete(remove))
        .route("/api/salons/{salon_id}/children", get(children))
        .route("/api/salons/{salon_id}/access", get(my_access))
        .route(
            "/api/salons/{salon_id}/permissions",
            get(list_permissions).post(grant).delete(revoke),
        )
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SalonQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSalon {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub parent_id: Option<String>,
    /// Superusers may create a salon on behalf of someone else.
    pub owner_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSalon {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    /// Absent keeps the parent, `null` detaches to the root.
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<String>>,
}

/// Tells a field sent as `null` apart from an absent one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub user_id: String,
    pub permission: PermissionKind,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub salon_id: String,
    pub is_owner: bool,
    pub permissions: Vec<PermissionKind>,
}

// =============================================================================
// Tree
// =============================================================================

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageQuery>,
    Query(q): Query<SalonQuery>,
) -> ApiResult<Json<Page<Salon>>> {
    let salons = state
        .db
        .salons()
        .list_visible(&user, q.name.as_deref(), today(), page.pagination()?)
        .await?;
    Ok(Json(salons))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateSalon>,
) -> ApiResult<(StatusCode, Json<Salon>)> {
    if let Some(parent_id) = &req.parent_id {
        authorize(&state, &user, parent_id, PermissionKind::Manage).await?;
    }
    let owner_id = match req.owner_id {
        Some(owner_id) if owner_id != user.id => {
            require_superuser(&user)?;
            state.db.users().get_by_id(&owner_id).await?;
            owner_id
        }
        _ => user.id.clone(),
    };

    let salon = state
        .db
        .salons()
        .create(NewSalon {
            name: req.name,
            description: req.description,
            address: req.address,
            phone: req.phone,
            email: req.email,
            parent_id: req.parent_id,
            owner_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(salon)))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
) -> ApiResult<Json<Salon>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    Ok(Json(state.db.salons().get_by_id(&salon_id).await?))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<UpdateSalon>,
) -> ApiResult<Json<Salon>> {
    authorize(&state, &user, &salon_id, PermissionKind::Manage).await?;
    if req.parent_id.is_some() {
        require_can_reparent(&user)?;
    }

    let update = SalonUpdate {
        name: req.name,
        description: req.description,
        address: req.address,
        phone: req.phone,
        email: req.email,
        is_active: req.is_active,
        parent_id: req.parent_id,
    };
    Ok(Json(state.db.salons().update(&salon_id, update).await?))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
) -> ApiResult<StatusCode> {
    let facts = access(&state, &user, &salon_id).await?;
    facts.context(&user, today()).require_owner()?;

    state.db.salons().delete(&salon_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn children(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
) -> ApiResult<Json<Vec<Salon>>> {
    authorize(&state, &user, &salon_id, PermissionKind::Read).await?;
    Ok(Json(state.db.salons().children(&salon_id).await?))
}

/// What the caller may do on the salon; empty when nothing.
async fn my_access(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
) -> ApiResult<Json<AccessResponse>> {
    let facts = access(&state, &user, &salon_id).await?;
    let ctx = facts.context(&user, today());
    Ok(Json(AccessResponse {
        salon_id,
        is_owner: ctx.is_owner(),
        permissions: ctx.effective_permissions(),
    }))
}

// =============================================================================
// Grants
// =============================================================================

async fn list_permissions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
) -> ApiResult<Json<Vec<SalonPermission>>> {
    authorize(&state, &user, &salon_id, PermissionKind::Manage).await?;
    Ok(Json(state.db.salons().permissions(&salon_id).await?))
}

async fn grant(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Json(req): Json<GrantRequest>,
) -> ApiResult<(StatusCode, Json<SalonPermission>)> {
    authorize(&state, &user, &salon_id, PermissionKind::Manage).await?;
    state.db.users().get_by_id(&req.user_id).await?;

    let granted = state
        .db
        .salons()
        .grant(&salon_id, &req.user_id, req.permission)
        .await?;
    info!(granted_by = %user.id, salon_id = %salon_id, "Grant recorded");
    Ok((StatusCode::CREATED, Json(granted)))
}

async fn revoke(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(salon_id): Path<String>,
    Query(req): Query<GrantRequest>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, &salon_id, PermissionKind::Manage).await?;
    state
        .db
        .salons()
        .revoke(&salon_id, &req.user_id, req.permission)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
