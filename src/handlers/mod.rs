// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) -> Protected (bearer access token). The router in `app`
// wraps every protected route in the JWT middleware.

pub mod protected;
pub mod public;

use axum::{extract::rejection::JsonRejection, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// Decode a JSON body into a request type, reporting both malformed JSON and
/// shape mismatches as `INVALID_JSON`
pub(crate) fn parse_body<T: DeserializeOwned>(payload: Result<Json<Value>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    serde_json::from_value(value).map_err(|e| ApiError::invalid_json(format!("Invalid request body: {}", e)))
}

/// Path ids that are not UUIDs cannot name anything
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} {} not found", what, raw)))
}
