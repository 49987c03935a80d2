//! Accounts: sign up, token exchange, profile, and superuser administration.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use salon_core::permissions::require_superuser;
use salon_core::{Page, SalonAssignment, SalonPermission, User};
use salon_db::{NewUser, UserFilter};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::PageQuery;
use crate::auth::{hash_password, verify_password, verify_password_decoy, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/token", post(token))
        .route("/api/users", post(sign_up).get(list))
        .route("/api/users/{id}/activate", post(activate))
        .route("/api/users/{id}/deactivate", post(deactivate))
        .route("/api/users/{id}", delete(remove))
        .route("/api/me", get(me))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// What the new account signs up as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpRole {
    #[default]
    User,
    Client,
    /// Waits for a superuser to activate it.
    Barber,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: SignUpRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// The caller with the salons they hold grants or assignments on.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub permissions: Vec<SalonPermission>,
    pub assignments: Vec<SalonAssignment>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let Some(user) = state.db.users().get_by_email(&req.email).await? else {
        verify_password_decoy(&req.password);
        return Err(invalid());
    };
    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("User is inactive"));
    }

    let access_token = state.jwt.issue(&user.id)?;
    info!(user_id = %user.id, "Token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.lifetime_secs(),
    }))
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let password_hash = hash_password(&req.password)?;
    let user = state
        .db
        .users()
        .create(NewUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            is_active: req.role != SignUpRole::Barber,
            is_staff: false,
            is_superuser: false,
        })
        .await?;
    info!(user_id = %user.id, role = ?req.role, active = user.is_active, "User signed up");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageQuery>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Json<Page<User>>> {
    require_superuser(&user)?;
    let filter = UserFilter {
        email: q.email,
        first_name: q.first_name,
        last_name: q.last_name,
    };
    Ok(Json(state.db.users().list(&filter, page.pagination()?).await?))
}

async fn activate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    require_superuser(&user)?;
    Ok(Json(state.db.users().set_active(&id, true).await?))
}

async fn deactivate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    require_superuser(&user)?;
    if user.id == id {
        return Err(ApiError::validation("You cannot deactivate yourself"));
    }
    Ok(Json(state.db.users().set_active(&id, false).await?))
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_superuser(&user)?;
    if user.id == id {
        return Err(ApiError::validation("You cannot delete yourself"));
    }
    state.db.users().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<MeResponse>> {
    let permissions = state.db.salons().grants_for_user(&user.id).await?;
    let assignments = state.db.assignments().for_user(&user.id).await?;
    Ok(Json(MeResponse {
        user,
        permissions,
        assignments,
    }))
}
