use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::forms::Employee;
use crate::handlers::{parse_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{EmployeeInput, EmployeeQuery, EmployeeUpdate};

/// GET /api/employees?search=&form_template_id= - List, optionally substring-searched
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<EmployeeQuery>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Vec<Employee>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let employees = state.employees.query(&query).await?;
    Ok(ApiResponse::success(employees))
}

/// POST /api/employees - Validate `data` against the template and store it
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Employee> {
    let input: EmployeeInput = parse_body(payload)?;
    let employee = state.employees.create(&auth_user.principal(), input).await?;
    Ok(ApiResponse::created(employee))
}

/// GET /api/employees/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Employee> {
    let id = parse_id(&id, "Employee")?;
    let employee = state.employees.get(id).await?;
    Ok(ApiResponse::success(employee))
}

/// PUT /api/employees/:id - Replace `data`; the template cannot change
pub async fn update(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Employee> {
    let id = parse_id(&id, "Employee")?;
    let update: EmployeeUpdate = parse_body(payload)?;
    let employee = state.employees.update(&auth_user.principal(), id, update).await?;
    Ok(ApiResponse::success(employee))
}

/// DELETE /api/employees/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "Employee")?;
    state.employees.delete(&auth_user.principal(), id).await?;
    Ok(ApiResponse::no_content())
}
