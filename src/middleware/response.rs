use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

/// Handler output for templates, employees and accounts: `{"success": true, "data": ...}`.
/// DELETE handlers answer 204 with no body at all.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { data, status: StatusCode::OK }
    }

    /// POST that stored a new template, employee or account
    pub fn created(data: T) -> Self {
        Self { data, status: StatusCode::CREATED }
    }
}

impl ApiResponse<()> {
    pub fn no_content() -> Self {
        Self { data: (), status: StatusCode::NO_CONTENT }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        if self.status == StatusCode::NO_CONTENT {
            return self.status.into_response();
        }

        match serde_json::to_value(&self.data) {
            Ok(data) => (self.status, Json(json!({ "success": true, "data": data }))).into_response(),
            Err(e) => {
                tracing::error!("Could not encode response body: {}", e);
                ApiError::internal_server_error("Could not encode response body").into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
