use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{ProfileChanges, User, UserProfile};
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ChangePasswordInput;

/// GET /api/auth/whoami - The account behind the access token
pub async fn whoami(State(state): State<AppState>, Extension(auth_user): Extension<AuthUser>) -> ApiResult<User> {
    let user = state.users.whoami(&auth_user.principal()).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let input: ChangePasswordInput = parse_body(payload)?;
    state.users.change_password(&auth_user.principal(), input).await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated successfully" })))
}

/// GET /api/auth/profile
pub async fn profile_get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    let profile = state.users.profile(&auth_user.principal()).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/auth/profile - Partial update of phone/address
pub async fn profile_put(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let changes: ProfileChanges = parse_body(payload)?;
    let profile = state.users.update_profile(&auth_user.principal(), changes).await?;
    Ok(ApiResponse::success(profile))
}
