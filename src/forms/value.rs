use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Date format accepted and produced for `date` fields
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Typed value of one entry in an employee payload
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(Number),
    Bool(bool),
    Date(NaiveDate),
    List(Vec<String>),
    /// Keys not described by any field pass through untouched
    Raw(Value),
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::String(s) => Value::String(s),
            FieldValue::Number(n) => Value::Number(n),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            FieldValue::Raw(v) => v,
        }
    }
}

/// Accepted payload in template field order, followed by pass-through keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPayload(pub IndexMap<String, FieldValue>);

impl NormalizedPayload {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into the JSON map persisted on the employee record
    pub fn into_json(self) -> Map<String, Value> {
        self.0.into_iter().map(|(k, v)| (k, v.into())).collect()
    }
}

/// Stringify any JSON value the way search compares it.
///
/// Strings compare by content, arrays by their elements, objects by their values.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map.values().map(value_text).collect::<Vec<_>>().join(", "),
    }
}

/// True for values that count as "not provided"
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
