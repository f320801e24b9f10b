use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::field_type::{FieldTypeKind, ShapeError, MAX_FIELD_ORDER};

/// A stored field slot in a form template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: Uuid,
    pub label: String,
    #[serde(rename = "field_type")]
    pub kind: FieldTypeKind,
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub order: u32,
}

/// A named, ordered schema owned by its creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field definition as submitted by an author
#[derive(Debug, Clone, Deserialize)]
pub struct FieldInput {
    pub label: String,
    #[serde(rename = "field_type", alias = "kind")]
    pub kind: FieldTypeKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub order: Option<u32>,
}

/// Validated field waiting for the store to assign an id
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDraft {
    pub label: String,
    pub kind: FieldTypeKind,
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub order: u32,
}

/// Validated template waiting for the store to assign ids and timestamps
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub fields: Vec<FieldDraft>,
}

/// Changes applied to an existing template in one store transaction.
///
/// `fields: Some(..)` deletes every existing field and inserts the new set,
/// so field ids never survive a replace.
#[derive(Debug, Clone, Default)]
pub struct TemplateChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub fields: Option<Vec<FieldDraft>>,
}

/// Shape errors for a whole field list, keyed by field position
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShapeErrors(pub BTreeMap<usize, ShapeError>);

impl ShapeErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Render as `fields[i] -> message` pairs for API responses
    pub fn to_field_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(index, err)| (format!("fields[{}]", index), err.to_string()))
            .collect()
    }
}

impl std::fmt::Display for ShapeErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(index, err)| format!("fields[{}]: {}", index, err))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ShapeErrors {}

/// Validate every field through the type registry and assign display order.
///
/// Missing `order` values fall back to the field's input position. The result is
/// sorted by order; equal orders keep their input sequence.
pub fn prepare_fields(inputs: Vec<FieldInput>) -> Result<Vec<FieldDraft>, ShapeErrors> {
    let mut errors = BTreeMap::new();
    let mut seen = HashSet::new();

    for (index, input) in inputs.iter().enumerate() {
        if let Err(err) = input.kind.validate_shape(&input.label, input.options.as_deref()) {
            errors.insert(index, err);
            continue;
        }
        if let Some(order) = input.order.filter(|o| *o > MAX_FIELD_ORDER) {
            errors.insert(index, ShapeError::OrderOutOfRange(order));
            continue;
        }
        let label = input.label.trim().to_string();
        if !seen.insert(label.clone()) {
            errors.insert(index, ShapeError::DuplicateLabel(label));
        }
    }

    if !errors.is_empty() {
        return Err(ShapeErrors(errors));
    }

    let mut drafts: Vec<FieldDraft> = inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| FieldDraft {
            label: input.label.trim().to_string(),
            kind: input.kind,
            required: input.required,
            options: input.options,
            order: input.order.unwrap_or(index as u32),
        })
        .collect();

    // stable: ties keep insertion order
    drafts.sort_by_key(|d| d.order);
    Ok(drafts)
}

impl FormTemplate {
    pub fn field(&self, label: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(label: &str, kind: FieldTypeKind, order: Option<u32>) -> FieldInput {
        FieldInput {
            label: label.to_string(),
            kind,
            required: false,
            options: None,
            order,
        }
    }

    #[test]
    fn sorts_by_explicit_order() {
        let drafts = prepare_fields(vec![
            input("Name", FieldTypeKind::Text, Some(1)),
            input("Age", FieldTypeKind::Number, Some(0)),
        ])
        .unwrap();

        let labels: Vec<&str> = drafts.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Age", "Name"]);
    }

    #[test]
    fn missing_order_uses_position_and_ties_keep_insertion() {
        let drafts = prepare_fields(vec![
            input("First", FieldTypeKind::Text, None),
            input("Second", FieldTypeKind::Text, Some(0)),
            input("Third", FieldTypeKind::Text, Some(1)),
        ])
        .unwrap();

        // First gets order 0 and ties with Second; Third gets 1 explicitly
        let labels: Vec<&str> = drafts.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["First", "Second", "Third"]);
        assert_eq!(drafts[0].order, 0);
    }

    #[test]
    fn collects_every_shape_error() {
        let errors = prepare_fields(vec![
            input("Dept", FieldTypeKind::Select, None),
            input("Name", FieldTypeKind::Text, None),
            input("", FieldTypeKind::Text, None),
            input("Name", FieldTypeKind::Email, None),
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.0[&0], ShapeError::MissingOptions(FieldTypeKind::Select));
        assert_eq!(errors.0[&2], ShapeError::EmptyLabel);
        assert_eq!(errors.0[&3], ShapeError::DuplicateLabel("Name".to_string()));
        assert!(errors.to_field_map().contains_key("fields[0]"));
    }

    #[test]
    fn order_must_fit_the_stored_column() {
        let errors = prepare_fields(vec![
            input("Name", FieldTypeKind::Text, Some(MAX_FIELD_ORDER)),
            input("Age", FieldTypeKind::Number, Some(3_000_000_000)),
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[&1], ShapeError::OrderOutOfRange(3_000_000_000));
        assert!(errors.to_field_map()["fields[1]"].contains("3000000000"));
    }

    #[test]
    fn field_input_accepts_kind_alias() {
        let parsed: FieldInput = serde_json::from_value(serde_json::json!({
            "label": "Team",
            "kind": "radio",
            "options": ["Red", "Blue"]
        }))
        .unwrap();
        assert_eq!(parsed.kind, FieldTypeKind::Radio);
        assert!(!parsed.required);
        assert_eq!(parsed.order, None);
    }
}
