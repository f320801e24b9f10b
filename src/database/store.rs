use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{ProfileChanges, User, UserCredentials, UserDraft, UserProfile};
use crate::forms::{Employee, EmployeeDraft, EmployeeFilter, FormTemplate, TemplateChanges, TemplateDraft};

/// Transactional persistence for accounts, templates and employee records.
///
/// Implementations assign ids and timestamps. Every method is one atomic unit:
/// a template is never visible with a partial field set, and the reference
/// check in `delete_template` runs in the same transaction as the delete.
#[async_trait]
pub trait FormStore: Send + Sync {
    // Templates

    async fn create_template(&self, draft: TemplateDraft) -> Result<FormTemplate, DatabaseError>;

    async fn get_template(&self, id: Uuid) -> Result<Option<FormTemplate>, DatabaseError>;

    async fn list_templates(&self) -> Result<Vec<FormTemplate>, DatabaseError>;

    /// Apply name/description changes and, when present, replace the whole field set
    async fn update_template(&self, id: Uuid, changes: TemplateChanges) -> Result<FormTemplate, DatabaseError>;

    /// Fails with `TemplateInUse` while any employee references the template
    async fn delete_template(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn count_templates(&self) -> Result<i64, DatabaseError>;

    // Employees

    /// Fails with `NotFound` if the referenced template no longer exists
    async fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee, DatabaseError>;

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, DatabaseError>;

    async fn update_employee_data(&self, id: Uuid, data: Map<String, Value>) -> Result<Employee, DatabaseError>;

    async fn delete_employee(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, DatabaseError>;

    async fn count_employees(&self) -> Result<i64, DatabaseError>;

    // Accounts

    /// Creates the account and its empty profile; `Conflict` on a taken username
    async fn create_user(&self, draft: UserDraft) -> Result<User, DatabaseError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>, DatabaseError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<UserCredentials>, DatabaseError>;

    async fn update_password_hash(&self, user_id: Uuid, password_hash: String) -> Result<(), DatabaseError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, DatabaseError>;

    async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<UserProfile, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
