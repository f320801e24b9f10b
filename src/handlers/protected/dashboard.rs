use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{self, Dashboard};

/// GET /api/dashboard - Template and employee counts
pub async fn get(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let counts = services::dashboard(state.store.as_ref()).await?;
    Ok(ApiResponse::success(counts))
}
