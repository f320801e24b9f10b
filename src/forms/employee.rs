use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// An employee record whose payload is interpreted through one template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub form_template_id: Uuid,
    pub data: Map<String, Value>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated record waiting for the store to assign id and timestamps
#[derive(Debug, Clone)]
pub struct EmployeeDraft {
    pub form_template_id: Uuid,
    pub data: Map<String, Value>,
    pub created_by: Uuid,
}

/// Optional narrowing for record listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmployeeFilter {
    pub form_template_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        self.form_template_id.map_or(true, |id| employee.form_template_id == id)
            && self.created_by.map_or(true, |id| employee.created_by == id)
    }
}
