use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported field kinds for a form template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTypeKind {
    Text,
    Number,
    Date,
    Password,
    Email,
    Textarea,
    Select,
    Checkbox,
    Radio,
}

/// Shape of the value a field accepts once validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Number,
    Date,
    Choice,
    ChoiceList,
}

/// Structural rules implied by a field kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldTypeInfo {
    pub requires_options: bool,
    pub value_shape: ScalarKind,
}

/// Errors raised while authoring a single field definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("Field label cannot be empty")]
    EmptyLabel,

    #[error("Field type '{0}' requires a non-empty list of options")]
    MissingOptions(FieldTypeKind),

    #[error("Label '{0}' is used by more than one field")]
    DuplicateLabel(String),

    #[error("Field order {0} is larger than {max}", max = MAX_FIELD_ORDER)]
    OrderOutOfRange(u32),
}

/// Largest accepted `order`; matches the signed 32-bit column it is stored in
pub const MAX_FIELD_ORDER: u32 = i32::MAX as u32;

impl FieldTypeKind {
    pub const ALL: [FieldTypeKind; 9] = [
        FieldTypeKind::Text,
        FieldTypeKind::Number,
        FieldTypeKind::Date,
        FieldTypeKind::Password,
        FieldTypeKind::Email,
        FieldTypeKind::Textarea,
        FieldTypeKind::Select,
        FieldTypeKind::Checkbox,
        FieldTypeKind::Radio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTypeKind::Text => "text",
            FieldTypeKind::Number => "number",
            FieldTypeKind::Date => "date",
            FieldTypeKind::Password => "password",
            FieldTypeKind::Email => "email",
            FieldTypeKind::Textarea => "textarea",
            FieldTypeKind::Select => "select",
            FieldTypeKind::Checkbox => "checkbox",
            FieldTypeKind::Radio => "radio",
        }
    }

    /// Look up the structural rules for this kind
    pub fn describe(&self) -> FieldTypeInfo {
        let value_shape = match self {
            FieldTypeKind::Number => ScalarKind::Number,
            FieldTypeKind::Date => ScalarKind::Date,
            FieldTypeKind::Select | FieldTypeKind::Radio => ScalarKind::Choice,
            FieldTypeKind::Checkbox => ScalarKind::ChoiceList,
            FieldTypeKind::Text
            | FieldTypeKind::Password
            | FieldTypeKind::Email
            | FieldTypeKind::Textarea => ScalarKind::String,
        };

        FieldTypeInfo {
            requires_options: matches!(
                self,
                FieldTypeKind::Select | FieldTypeKind::Checkbox | FieldTypeKind::Radio
            ),
            value_shape,
        }
    }

    /// Check a single field's shape against the rules of its kind.
    ///
    /// Options on kinds that do not use them are tolerated.
    pub fn validate_shape(&self, label: &str, options: Option<&[String]>) -> Result<(), ShapeError> {
        if label.trim().is_empty() {
            return Err(ShapeError::EmptyLabel);
        }

        if self.describe().requires_options && options.map_or(true, |o| o.is_empty()) {
            return Err(ShapeError::MissingOptions(*self));
        }

        Ok(())
    }
}

impl fmt::Display for FieldTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldTypeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldTypeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown field type '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_kinds_require_options() {
        for kind in [FieldTypeKind::Select, FieldTypeKind::Checkbox, FieldTypeKind::Radio] {
            assert_eq!(
                kind.validate_shape("Choice", None),
                Err(ShapeError::MissingOptions(kind))
            );
            assert_eq!(
                kind.validate_shape("Choice", Some(&[])),
                Err(ShapeError::MissingOptions(kind))
            );
            assert!(kind.validate_shape("Choice", Some(&["a".to_string()])).is_ok());
        }
    }

    #[test]
    fn other_kinds_accept_missing_or_extra_options() {
        for kind in FieldTypeKind::ALL.iter().filter(|k| !k.describe().requires_options) {
            assert!(kind.validate_shape("Plain", None).is_ok());
            assert!(kind.validate_shape("Plain", Some(&["ignored".to_string()])).is_ok());
        }
    }

    #[test]
    fn blank_label_is_rejected() {
        assert_eq!(
            FieldTypeKind::Text.validate_shape("   ", None),
            Err(ShapeError::EmptyLabel)
        );
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("textarea".parse::<FieldTypeKind>(), Ok(FieldTypeKind::Textarea));
        assert!("dropdown".parse::<FieldTypeKind>().is_err());
        let kind: FieldTypeKind = serde_json::from_str("\"radio\"").unwrap();
        assert_eq!(kind, FieldTypeKind::Radio);
    }

    #[test]
    fn describes_value_shapes() {
        assert_eq!(FieldTypeKind::Checkbox.describe().value_shape, ScalarKind::ChoiceList);
        assert_eq!(FieldTypeKind::Radio.describe().value_shape, ScalarKind::Choice);
        assert_eq!(FieldTypeKind::Password.describe().value_shape, ScalarKind::String);
        assert!(!FieldTypeKind::Email.describe().requires_options);
    }
}
