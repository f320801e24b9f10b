use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::forms::FormTemplate;
use crate::handlers::{parse_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{TemplatePatch, TemplateInput};

/// GET /api/forms - All templates with their ordered fields
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<FormTemplate>> {
    let templates = state.forms.list_templates().await?;
    Ok(ApiResponse::success(templates))
}

/// POST /api/forms - Create a template and its fields in one unit
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<FormTemplate> {
    let input: TemplateInput = parse_body(payload)?;
    let template = state.forms.create_template(&auth_user.principal(), input).await?;
    Ok(ApiResponse::created(template))
}

/// GET /api/forms/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FormTemplate> {
    let id = parse_id(&id, "Form template")?;
    let template = state.forms.get_template(id).await?;
    Ok(ApiResponse::success(template))
}

/// PUT /api/forms/:id - Patch name/description; a `fields` key replaces every field
pub async fn update(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<FormTemplate> {
    let id = parse_id(&id, "Form template")?;
    let patch: TemplatePatch = parse_body(payload)?;
    let template = state.forms.update_template(&auth_user.principal(), id, patch).await?;
    Ok(ApiResponse::success(template))
}

/// DELETE /api/forms/:id - 409 TEMPLATE_IN_USE while employees reference it
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "Form template")?;
    state.forms.delete_template(&auth_user.principal(), id).await?;
    Ok(ApiResponse::no_content())
}
