use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuthSession, LoginInput, RegisterInput};

#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh: String,
}

/// POST /api/auth/register - Create an account and receive a token pair
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AuthSession> {
    let input: RegisterInput = parse_body(payload)?;
    let session = state.users.register(input).await?;
    Ok(ApiResponse::created(session))
}

/// POST /api/auth/login - Exchange username/password for a token pair
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AuthSession> {
    let input: LoginInput = parse_body(payload)?;
    let session = state.users.login(input).await?;
    Ok(ApiResponse::success(session))
}

/// POST /api/auth/token/refresh - Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let input: RefreshInput = parse_body(payload)?;
    let access = state.users.refresh(&input.refresh).await?;
    Ok(ApiResponse::success(json!({ "access": access })))
}
