use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::FormStore;
use crate::forms::{search, validate, Employee, EmployeeDraft, EmployeeFilter, FormError};
use crate::types::Principal;

/// Body of `POST /api/employees`
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeInput {
    pub form_template_id: Uuid,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Body of `PUT /api/employees/:id`; a present `data` replaces the stored payload,
/// an absent one keeps it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeUpdate {
    #[serde(default)]
    pub form_template_id: Option<Uuid>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Query string of `GET /api/employees`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub form_template_id: Option<Uuid>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl EmployeeQuery {
    pub fn filter(&self) -> EmployeeFilter {
        EmployeeFilter { form_template_id: self.form_template_id, created_by: self.created_by }
    }
}

/// Employee records: every write goes through the schema validator first
pub struct EmployeeService {
    store: Arc<dyn FormStore>,
    max_search_results: Option<usize>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn FormStore>, max_search_results: Option<usize>) -> Self {
        Self { store, max_search_results }
    }

    pub async fn create(&self, principal: &Principal, input: EmployeeInput) -> Result<Employee, FormError> {
        let template = self
            .store
            .get_template(input.form_template_id)
            .await?
            .ok_or_else(|| FormError::NotFound(format!("Form template {}", input.form_template_id)))?;

        let normalized = validate(&template, &input.data)?;

        // The template may vanish between the read and the insert; the store
        // re-checks the reference and reports NotFound.
        let employee = self
            .store
            .create_employee(EmployeeDraft {
                form_template_id: template.id,
                data: normalized.into_json(),
                created_by: principal.user_id,
            })
            .await?;

        info!("User {} created employee {} on template {}", principal.username, employee.id, template.id);
        Ok(employee)
    }

    pub async fn get(&self, id: Uuid) -> Result<Employee, FormError> {
        self.store
            .get_employee(id)
            .await?
            .ok_or_else(|| FormError::NotFound(format!("Employee {}", id)))
    }

    /// Replace the payload after validating it against the record's own template.
    /// Without new data the stored payload is revalidated and kept.
    pub async fn update(&self, principal: &Principal, id: Uuid, update: EmployeeUpdate) -> Result<Employee, FormError> {
        let existing = self.get(id).await?;
        if update.form_template_id.is_some_and(|t| t != existing.form_template_id) {
            return Err(FormError::TemplateImmutable);
        }

        let template = self
            .store
            .get_template(existing.form_template_id)
            .await?
            .ok_or_else(|| FormError::NotFound(format!("Form template {}", existing.form_template_id)))?;

        let data = update.data.unwrap_or(existing.data);
        let normalized = validate(&template, &data)?;
        let employee = self.store.update_employee_data(id, normalized.into_json()).await?;

        info!("User {} updated employee {}", principal.username, id);
        Ok(employee)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), FormError> {
        self.store.delete_employee(id).await?;
        info!("User {} deleted employee {}", principal.username, id);
        Ok(())
    }

    pub async fn list(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, FormError> {
        Ok(self.store.list_employees(filter).await?)
    }

    /// Case-insensitive substring scan over every stored value
    pub async fn search(&self, query: &str, filter: &EmployeeFilter) -> Result<Vec<Employee>, FormError> {
        let candidates = self.store.list_employees(filter).await?;
        let scanned = candidates.len();

        let mut found = search::search(candidates, query);
        if let Some(max) = self.max_search_results {
            found.truncate(max);
        }

        debug!("Search '{}' matched {} of {} record(s)", query, found.len(), scanned);
        Ok(found)
    }

    /// Listing entry point used by the HTTP layer
    pub async fn query(&self, query: &EmployeeQuery) -> Result<Vec<Employee>, FormError> {
        let filter = query.filter();
        match query.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => self.search(q, &filter).await,
            _ => self.list(&filter).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::forms::FieldErrorKind;
    use crate::services::{FormService, TemplateInput};
    use serde_json::json;

    struct Fixture {
        forms: FormService,
        employees: EmployeeService,
        admin: Principal,
    }

    fn fixture(max_search_results: Option<usize>) -> Fixture {
        let store: Arc<dyn FormStore> = Arc::new(MemoryStore::new());
        Fixture {
            forms: FormService::new(store.clone(), 50),
            employees: EmployeeService::new(store, max_search_results),
            admin: Principal::new(Uuid::new_v4(), "admin"),
        }
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn template(f: &Fixture, fields: Value) -> Uuid {
        let input: TemplateInput = serde_json::from_value(json!({"name": "Staff", "fields": fields})).unwrap();
        f.forms.create_template(&f.admin, input).await.unwrap().id
    }

    async fn employee(f: &Fixture, template_id: Uuid, payload: Value) -> Employee {
        f.employees
            .create(&f.admin, EmployeeInput { form_template_id: template_id, data: data(payload) })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_validates_and_normalizes() {
        let f = fixture(None);
        let t = template(
            &f,
            json!([
                {"label": "Name", "field_type": "text", "required": true},
                {"label": "Age", "field_type": "number"},
                {"label": "Notes", "field_type": "textarea"}
            ]),
        )
        .await;

        let created = employee(&f, t, json!({"Name": "Ada", "Age": "36", "Notes": ""})).await;
        assert_eq!(created.data.get("Age"), Some(&json!(36)));
        assert!(!created.data.contains_key("Notes"));
        assert_eq!(created.created_by, f.admin.user_id);

        let err = f
            .employees
            .create(&f.admin, EmployeeInput { form_template_id: t, data: data(json!({"Age": "old"})) })
            .await
            .unwrap_err();
        let FormError::Fields(errors) = err else {
            panic!("expected field errors, got {:?}", err);
        };
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "Name" && e.kind == FieldErrorKind::Required));
        assert!(errors.iter().any(|e| e.field == "Age" && e.kind == FieldErrorKind::InvalidNumber));
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let f = fixture(None);
        let err = f
            .employees
            .create(&f.admin, EmployeeInput { form_template_id: Uuid::new_v4(), data: Map::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::NotFound(_)));
    }

    #[tokio::test]
    async fn template_cannot_be_swapped() {
        let f = fixture(None);
        let first = template(&f, json!([])).await;
        let second = template(&f, json!([])).await;
        let record = employee(&f, first, json!({})).await;

        let err = f
            .employees
            .update(
                &f.admin,
                record.id,
                EmployeeUpdate { form_template_id: Some(second), data: Some(Map::new()) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::TemplateImmutable));

        let same = f
            .employees
            .update(
                &f.admin,
                record.id,
                EmployeeUpdate { form_template_id: Some(first), data: Some(data(json!({"extra": 1}))) },
            )
            .await
            .unwrap();
        assert_eq!(same.data.get("extra"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn update_without_data_keeps_the_payload() {
        let f = fixture(None);
        let t = template(&f, json!([{"label": "Name", "field_type": "text", "required": true}])).await;
        let record = employee(&f, t, json!({"Name": "Ada"})).await;

        let update: EmployeeUpdate = serde_json::from_value(json!({"form_template_id": t})).unwrap();
        assert_eq!(update.data, None);
        let kept = f.employees.update(&f.admin, record.id, update).await.unwrap();
        assert_eq!(kept.data.get("Name"), Some(&json!("Ada")));

        let cleared: EmployeeUpdate = serde_json::from_value(json!({"data": {}})).unwrap();
        assert!(matches!(
            f.employees.update(&f.admin, record.id, cleared).await,
            Err(FormError::Fields(_))
        ));
        assert_eq!(f.employees.get(record.id).await.unwrap().data.get("Name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn delete_is_guarded_until_records_are_gone() {
        let f = fixture(None);
        let t = template(&f, json!([{"label": "Name", "field_type": "text"}])).await;
        let record = employee(&f, t, json!({"Name": "Ada"})).await;

        assert!(matches!(
            f.forms.delete_template(&f.admin, t).await,
            Err(FormError::TemplateInUse { references: 1, .. })
        ));

        f.employees.delete(&f.admin, record.id).await.unwrap();
        f.forms.delete_template(&f.admin, t).await.unwrap();
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let f = fixture(None);
        let t = template(&f, json!([{"label": "name", "field_type": "text"}])).await;
        let jane = employee(&f, t, json!({"name": "Jane Doe"})).await;
        employee(&f, t, json!({"name": "John"})).await;

        for query in ["jane", "JANE"] {
            let found = f.employees.search(query, &EmployeeFilter::default()).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, jane.id);
        }
    }

    #[tokio::test]
    async fn search_results_are_capped() {
        let f = fixture(Some(2));
        let t = template(&f, json!([{"label": "Team", "field_type": "text"}])).await;
        for _ in 0..3 {
            employee(&f, t, json!({"Team": "Platform"})).await;
        }

        let query = EmployeeQuery { search: Some("platform".into()), ..Default::default() };
        assert_eq!(f.employees.query(&query).await.unwrap().len(), 2);
        assert_eq!(f.employees.query(&EmployeeQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn replace_leaves_records_keyed_to_old_labels() {
        let f = fixture(None);
        let t = template(&f, json!([{"label": "Name", "field_type": "text", "required": true}])).await;
        let record = employee(&f, t, json!({"Name": "Ada"})).await;

        // a replace landing after the record was validated against the old schema
        let fields = serde_json::from_value(json!([{"label": "Full name", "field_type": "text", "required": true}]))
            .unwrap();
        f.forms.replace_fields(&f.admin, t, fields).await.unwrap();

        let stored = f.employees.get(record.id).await.unwrap();
        assert_eq!(stored.data.get("Name"), Some(&json!("Ada")));

        let resubmit = f
            .employees
            .update(&f.admin, record.id, EmployeeUpdate { form_template_id: None, data: Some(stored.data.clone()) })
            .await
            .unwrap_err();
        let FormError::Fields(errors) = resubmit else {
            panic!("expected field errors");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[0].field, "Full name");
    }

    #[tokio::test]
    async fn racing_creates_against_a_replace_all_land() {
        let f = Arc::new(fixture(None));
        let t = template(&f, json!([{"label": "Name", "field_type": "text"}])).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.employees
                    .create(&f.admin, EmployeeInput { form_template_id: t, data: data(json!({"Name": format!("e{}", i)})) })
                    .await
            }));
        }
        let fields = serde_json::from_value(json!([{"label": "Name", "field_type": "text"}])).unwrap();
        f.forms.replace_fields(&f.admin, t, fields).await.unwrap();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(f.employees.list(&EmployeeFilter { form_template_id: Some(t), created_by: None }).await.unwrap().len(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_creates_against_a_delete_leave_no_orphans() {
        let f = Arc::new(fixture(None));
        let t = template(&f, json!([{"label": "Name", "field_type": "text"}])).await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.employees
                    .create(&f.admin, EmployeeInput { form_template_id: t, data: data(json!({"Name": format!("e{}", i)})) })
                    .await
            }));
        }
        let deleted = f.forms.delete_template(&f.admin, t).await;

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(FormError::NotFound(_)) => {}
                Err(other) => panic!("unexpected create failure: {:?}", other),
            }
        }

        let remaining = f
            .employees
            .list(&EmployeeFilter { form_template_id: Some(t), created_by: None })
            .await
            .unwrap();
        match deleted {
            Ok(()) => {
                // every create lost the race, so nothing points at the removed template
                assert_eq!(created, 0);
                assert!(remaining.is_empty());
                assert!(matches!(f.forms.get_template(t).await, Err(FormError::NotFound(_))));
            }
            Err(FormError::TemplateInUse { references, .. }) => {
                assert!(references >= 1);
                assert_eq!(remaining.len(), created);
                assert!(f.forms.get_template(t).await.is_ok());
            }
            Err(other) => panic!("unexpected delete failure: {:?}", other),
        }
    }
}
