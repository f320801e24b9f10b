use super::employee::Employee;
use super::value::value_text;

/// True when any value in the record's payload contains `query`, ignoring case.
///
/// Values are stringified regardless of the field kind that produced them.
pub fn matches(employee: &Employee, query: &str) -> bool {
    let needle = query.to_lowercase();
    employee
        .data
        .values()
        .any(|value| value_text(value).to_lowercase().contains(&needle))
}

/// Full scan over `records`, keeping those whose payload matches `query`.
///
/// Cost is records × values per record; there is no index behind this.
pub fn search(records: Vec<Employee>, query: &str) -> Vec<Employee> {
    records.into_iter().filter(|e| matches(e, query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn employee(data: Value) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            form_template_id: Uuid::new_v4(),
            data: data.as_object().cloned().unwrap(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn finds_case_insensitive_substring() {
        let jane = employee(json!({"name": "Jane Doe"}));
        let john = employee(json!({"name": "John"}));
        let records = vec![jane.clone(), john];

        assert_eq!(search(records.clone(), "jane"), vec![jane.clone()]);
        assert_eq!(search(records, "JANE"), vec![jane]);
    }

    #[test]
    fn matches_non_string_values() {
        let e = employee(json!({"age": 42, "skills": ["Rust", "SQL"], "active": true}));
        assert!(matches(&e, "42"));
        assert!(matches(&e, "sql"));
        assert!(matches(&e, "TRUE"));
        assert!(!matches(&e, "python"));
    }

    #[test]
    fn empty_query_matches_everything_with_data() {
        let e = employee(json!({"name": "x"}));
        assert!(matches(&e, ""));
    }
}
