use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::forms::Employee;

/// Row of the `employees` table
#[derive(Debug, Clone, FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub form_template_id: Uuid,
    pub data: Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = DatabaseError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let data = match row.data {
            Value::Object(map) => map,
            other => {
                return Err(DatabaseError::Corrupt(format!(
                    "employee {} data is not an object: {}",
                    row.id, other
                )))
            }
        };

        Ok(Employee {
            id: row.id,
            form_template_id: row.form_template_id,
            data,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
