// services/mod.rs - Use-cases sitting between the HTTP handlers and the store
//
// Services own the rules (shape checks, payload validation, password policy)
// and call the store once per mutation so each operation stays atomic.

pub mod employee_service;
pub mod form_service;
pub mod user_service;

pub use employee_service::{EmployeeInput, EmployeeQuery, EmployeeService, EmployeeUpdate};
pub use form_service::{FormService, TemplateInput, TemplatePatch};
pub use user_service::{AuthSession, ChangePasswordInput, LoginInput, RegisterInput, UserService};

use serde::Serialize;

use crate::database::{DatabaseError, FormStore};

/// Counts shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub form_templates_count: i64,
    pub employees_count: i64,
}

pub async fn dashboard(store: &dyn FormStore) -> Result<Dashboard, DatabaseError> {
    Ok(Dashboard {
        form_templates_count: store.count_templates().await?,
        employees_count: store.count_employees().await?,
    })
}
