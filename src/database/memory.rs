use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{ProfileChanges, User, UserCredentials, UserDraft, UserProfile};
use super::store::FormStore;
use crate::forms::{
    Employee, EmployeeDraft, EmployeeFilter, FieldDefinition, FieldDraft, FormTemplate, TemplateChanges,
    TemplateDraft,
};

#[derive(Default)]
struct Tables {
    users: IndexMap<Uuid, UserCredentials>,
    profiles: IndexMap<Uuid, UserProfile>,
    templates: IndexMap<Uuid, FormTemplate>,
    employees: IndexMap<Uuid, Employee>,
}

/// Process-local store; one write lock covers every table so each call is atomic
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn materialize(drafts: Vec<FieldDraft>) -> Vec<FieldDefinition> {
    let mut fields: Vec<FieldDefinition> = drafts
        .into_iter()
        .map(|d| FieldDefinition {
            id: Uuid::new_v4(),
            label: d.label,
            kind: d.kind,
            required: d.required,
            options: d.options,
            order: d.order,
        })
        .collect();
    fields.sort_by_key(|f| f.order);
    fields
}

fn template_not_found(id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("Form template {}", id))
}

fn employee_not_found(id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("Employee {}", id))
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn create_template(&self, draft: TemplateDraft) -> Result<FormTemplate, DatabaseError> {
        let now = Utc::now();
        let template = FormTemplate {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            fields: materialize(draft.fields),
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.tables.write().await;
        tables.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<FormTemplate>, DatabaseError> {
        Ok(self.tables.read().await.templates.get(&id).cloned())
    }

    async fn list_templates(&self) -> Result<Vec<FormTemplate>, DatabaseError> {
        Ok(self.tables.read().await.templates.values().cloned().collect())
    }

    async fn update_template(&self, id: Uuid, changes: TemplateChanges) -> Result<FormTemplate, DatabaseError> {
        let mut tables = self.tables.write().await;
        let template = tables.templates.get_mut(&id).ok_or_else(|| template_not_found(id))?;

        if let Some(name) = changes.name {
            template.name = name;
        }
        if let Some(description) = changes.description {
            template.description = description;
        }
        if let Some(fields) = changes.fields {
            template.fields = materialize(fields);
        }
        template.updated_at = Utc::now();

        Ok(template.clone())
    }

    async fn delete_template(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.templates.contains_key(&id) {
            return Err(template_not_found(id));
        }

        let references = tables.employees.values().filter(|e| e.form_template_id == id).count() as i64;
        if references > 0 {
            return Err(DatabaseError::TemplateInUse { template_id: id, references });
        }

        tables.templates.shift_remove(&id);
        Ok(())
    }

    async fn count_templates(&self) -> Result<i64, DatabaseError> {
        Ok(self.tables.read().await.templates.len() as i64)
    }

    async fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.templates.contains_key(&draft.form_template_id) {
            return Err(template_not_found(draft.form_template_id));
        }

        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            form_template_id: draft.form_template_id,
            data: draft.data,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, DatabaseError> {
        Ok(self.tables.read().await.employees.get(&id).cloned())
    }

    async fn update_employee_data(&self, id: Uuid, data: Map<String, Value>) -> Result<Employee, DatabaseError> {
        let mut tables = self.tables.write().await;
        let employee = tables.employees.get_mut(&id).ok_or_else(|| employee_not_found(id))?;
        employee.data = data;
        employee.updated_at = Utc::now();
        Ok(employee.clone())
    }

    async fn delete_employee(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables
            .employees
            .shift_remove(&id)
            .map(|_| ())
            .ok_or_else(|| employee_not_found(id))
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn count_employees(&self) -> Result<i64, DatabaseError> {
        Ok(self.tables.read().await.employees.len() as i64)
    }

    async fn create_user(&self, draft: UserDraft) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.user.username == draft.username) {
            return Err(DatabaseError::Conflict(format!("username '{}' is already taken", draft.username)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: draft.username,
            email: draft.email,
            first_name: draft.first_name,
            last_name: draft.last_name,
            created_at: now,
        };
        tables.users.insert(
            user.id,
            UserCredentials { user: user.clone(), password_hash: draft.password_hash },
        );
        tables.profiles.insert(
            user.id,
            UserProfile { user_id: user.id, phone: String::new(), address: String::new(), created_at: now },
        );
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.user.username == username).cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserCredentials>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: String) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("User {}", user_id)))?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, DatabaseError> {
        self.tables
            .read()
            .await
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("Profile for user {}", user_id)))
    }

    async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<UserProfile, DatabaseError> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Profile for user {}", user_id)))?;
        if let Some(phone) = changes.phone {
            profile.phone = phone;
        }
        if let Some(address) = changes.address {
            profile.address = address;
        }
        Ok(profile.clone())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
