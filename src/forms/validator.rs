use chrono::NaiveDate;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::field_type::FieldTypeKind;
use super::template::{FieldDefinition, FormTemplate};
use super::value::{is_empty_value, FieldValue, NormalizedPayload, DATE_FORMAT};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email regex"));

/// Basic `local@domain.tld` shape check shared with account registration
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Why a single field was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldErrorKind {
    #[error("This field is required")]
    Required,

    #[error("Expected a number")]
    InvalidNumber,

    #[error("Expected a date in YYYY-MM-DD format")]
    InvalidDate,

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("'{value}' is not one of the available options")]
    InvalidChoice { value: String },

    #[error("Expected a single value")]
    NotScalar,

    #[error("Expected a list of options")]
    NotAList,
}

/// A failure tied to one template field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    #[serde(flatten)]
    pub kind: FieldErrorKind,
}

/// The complete set of failures for one payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Render as `field -> message` for API responses
    pub fn to_field_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|e| (e.field.clone(), e.kind.to_string()))
            .collect()
    }
}

/// Validate a candidate payload against a template.
///
/// Fields are checked in template order and every failure is reported. Keys that
/// no field describes are passed through unchanged after the template fields.
pub fn validate(template: &FormTemplate, payload: &Map<String, Value>) -> Result<NormalizedPayload, FieldErrors> {
    let mut fields: Vec<&FieldDefinition> = template.fields.iter().collect();
    fields.sort_by_key(|f| f.order);

    let mut accepted = IndexMap::new();
    let mut errors = Vec::new();

    for field in fields {
        let raw = payload.get(&field.label);

        match raw {
            None => {
                if field.required {
                    errors.push(FieldError { field: field.label.clone(), kind: FieldErrorKind::Required });
                }
            }
            Some(value) if is_empty_value(value) => {
                if field.required {
                    errors.push(FieldError { field: field.label.clone(), kind: FieldErrorKind::Required });
                }
            }
            Some(value) => match check_value(field, value) {
                Ok(v) => {
                    accepted.insert(field.label.clone(), v);
                }
                Err(kind) => errors.push(FieldError { field: field.label.clone(), kind }),
            },
        }
    }

    if !errors.is_empty() {
        return Err(FieldErrors(errors));
    }

    for (key, value) in payload {
        if template.field(key).is_none() {
            accepted.insert(key.clone(), FieldValue::Raw(value.clone()));
        }
    }

    Ok(NormalizedPayload(accepted))
}

fn check_value(field: &FieldDefinition, value: &Value) -> Result<FieldValue, FieldErrorKind> {
    match field.kind {
        FieldTypeKind::Number => parse_number(value).map(FieldValue::Number),
        FieldTypeKind::Date => {
            let text = scalar_text(value)?;
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| FieldErrorKind::InvalidDate)
        }
        FieldTypeKind::Email => {
            let text = scalar_text(value)?;
            let text = text.trim();
            if EMAIL_PATTERN.is_match(text) {
                Ok(FieldValue::String(text.to_string()))
            } else {
                Err(FieldErrorKind::InvalidEmail)
            }
        }
        FieldTypeKind::Select | FieldTypeKind::Radio => {
            let text = scalar_text(value)?;
            ensure_option(field, &text)?;
            Ok(FieldValue::String(text))
        }
        FieldTypeKind::Checkbox => {
            let selected = match value {
                Value::Array(items) => items
                    .iter()
                    .map(scalar_text)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| FieldErrorKind::NotAList)?,
                // a lone checked box arrives as a single value
                other => vec![scalar_text(other)?],
            };
            for item in &selected {
                ensure_option(field, item)?;
            }
            Ok(FieldValue::List(selected))
        }
        FieldTypeKind::Text | FieldTypeKind::Password | FieldTypeKind::Textarea => match value {
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::Number(n) => Ok(FieldValue::Number(n.clone())),
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            _ => Err(FieldErrorKind::NotScalar),
        },
    }
}

fn ensure_option(field: &FieldDefinition, value: &str) -> Result<(), FieldErrorKind> {
    let known = field
        .options
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|o| o == value);
    if known {
        Ok(())
    } else {
        Err(FieldErrorKind::InvalidChoice { value: value.to_string() })
    }
}

fn scalar_text(value: &Value) -> Result<String, FieldErrorKind> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(FieldErrorKind::NotScalar),
    }
}

fn parse_number(value: &Value) -> Result<Number, FieldErrorKind> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Number::from(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .ok_or(FieldErrorKind::InvalidNumber)
        }
        _ => Err(FieldErrorKind::InvalidNumber),
    }
}
