// forms/mod.rs - Dynamic form template and record engine
//
// Field kinds and their structural rules live in `field_type`, templates and
// their authoring rules in `template`, and the payload checks applied on every
// record write in `validator`. Search is a plain scan over stored payloads.

pub mod employee;
pub mod field_type;
pub mod search;
pub mod template;
pub mod validator;
pub mod value;

pub use employee::{Employee, EmployeeDraft, EmployeeFilter};
pub use field_type::{FieldTypeInfo, FieldTypeKind, ScalarKind, ShapeError, MAX_FIELD_ORDER};
pub use template::{
    prepare_fields, FieldDefinition, FieldDraft, FieldInput, FormTemplate, ShapeErrors, TemplateChanges,
    TemplateDraft,
};
pub use validator::{is_valid_email, validate, FieldError, FieldErrorKind, FieldErrors};
pub use value::{FieldValue, NormalizedPayload};

use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

/// Errors surfaced by template and record operations
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Template name cannot be empty")]
    EmptyName,

    #[error("Template has too many fields: {count} (maximum {max})")]
    TooManyFields { count: usize, max: usize },

    #[error("Invalid field definitions: {0}")]
    Shape(ShapeErrors),

    #[error("Record failed validation: {0}")]
    Fields(FieldErrors),

    #[error("Form template {template_id} is referenced by {references} employee record(s)")]
    TemplateInUse { template_id: Uuid, references: i64 },

    #[error("The form template of an existing employee cannot be changed")]
    TemplateImmutable,

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for FormError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => FormError::NotFound(what),
            DatabaseError::TemplateInUse { template_id, references } => {
                FormError::TemplateInUse { template_id, references }
            }
            other => FormError::Database(other),
        }
    }
}

impl From<ShapeErrors> for FormError {
    fn from(err: ShapeErrors) -> Self {
        FormError::Shape(err)
    }
}

impl From<FieldErrors> for FormError {
    fn from(err: FieldErrors) -> Self {
        FormError::Fields(err)
    }
}
