use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::forms::{FieldDefinition, FormTemplate};

/// Row of the `form_templates` table
#[derive(Debug, Clone, FromRow)]
pub struct FormTemplateRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `form_fields` table
#[derive(Debug, Clone, FromRow)]
pub struct FormFieldRow {
    pub id: Uuid,
    pub form_template_id: Uuid,
    pub label: String,
    pub field_type: String,
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub sort_order: i32,
    pub position: i32,
}

impl TryFrom<FormFieldRow> for FieldDefinition {
    type Error = DatabaseError;

    fn try_from(row: FormFieldRow) -> Result<Self, Self::Error> {
        let kind = row
            .field_type
            .parse()
            .map_err(|e: String| DatabaseError::Corrupt(format!("field {}: {}", row.id, e)))?;
        let order = u32::try_from(row.sort_order)
            .map_err(|_| DatabaseError::Corrupt(format!("field {}: negative order", row.id)))?;

        Ok(FieldDefinition {
            id: row.id,
            label: row.label,
            kind,
            required: row.required,
            options: row.options,
            order,
        })
    }
}

impl FormTemplateRow {
    /// Attach fields (already in sort_order, position order) to the template row
    pub fn into_template(self, fields: Vec<FormFieldRow>) -> Result<FormTemplate, DatabaseError> {
        let fields = fields
            .into_iter()
            .map(FieldDefinition::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FormTemplate {
            id: self.id,
            name: self.name,
            description: self.description,
            fields,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Group field rows under their template rows, preserving row order
pub fn assemble_templates(
    templates: Vec<FormTemplateRow>,
    fields: Vec<FormFieldRow>,
) -> Result<Vec<FormTemplate>, DatabaseError> {
    let mut by_template: HashMap<Uuid, Vec<FormFieldRow>> = HashMap::new();
    for field in fields {
        by_template.entry(field.form_template_id).or_default().push(field);
    }

    templates
        .into_iter()
        .map(|row| {
            let fields = by_template.remove(&row.id).unwrap_or_default();
            row.into_template(fields)
        })
        .collect()
}
