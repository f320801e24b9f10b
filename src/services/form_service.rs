use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::FormStore;
use crate::forms::{prepare_fields, FieldDraft, FieldInput, FormError, FormTemplate, TemplateChanges, TemplateDraft};
use crate::types::Principal;

/// Body of `POST /api/forms`
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldInput>,
}

/// Body of `PUT /api/forms/:id`; every member is optional.
///
/// `description: null` clears the description, an absent key leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub fields: Option<Vec<FieldInput>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Template authoring: shape checks, ordering, and the delete guard
pub struct FormService {
    store: Arc<dyn FormStore>,
    max_fields: usize,
}

impl FormService {
    pub fn new(store: Arc<dyn FormStore>, max_fields: usize) -> Self {
        Self { store, max_fields }
    }

    fn check_name(name: &str) -> Result<String, FormError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FormError::EmptyName);
        }
        Ok(name.to_string())
    }

    fn check_fields(&self, fields: Vec<FieldInput>) -> Result<Vec<FieldDraft>, FormError> {
        if fields.len() > self.max_fields {
            return Err(FormError::TooManyFields { count: fields.len(), max: self.max_fields });
        }
        Ok(prepare_fields(fields)?)
    }

    fn normalize_description(description: Option<String>) -> Option<String> {
        description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
    }

    /// Validate every field and persist the template with its fields in one unit
    pub async fn create_template(&self, principal: &Principal, input: TemplateInput) -> Result<FormTemplate, FormError> {
        let name = Self::check_name(&input.name)?;
        let fields = self.check_fields(input.fields)?;

        let template = self
            .store
            .create_template(TemplateDraft {
                name,
                description: Self::normalize_description(input.description),
                created_by: principal.user_id,
                fields,
            })
            .await?;

        info!(
            "User {} created form template {} ({} fields)",
            principal.username,
            template.id,
            template.fields.len()
        );
        Ok(template)
    }

    pub async fn get_template(&self, id: Uuid) -> Result<FormTemplate, FormError> {
        self.store
            .get_template(id)
            .await?
            .ok_or_else(|| FormError::NotFound(format!("Form template {}", id)))
    }

    pub async fn list_templates(&self) -> Result<Vec<FormTemplate>, FormError> {
        Ok(self.store.list_templates().await?)
    }

    /// Patch name/description; a present field list replaces every field
    pub async fn update_template(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: TemplatePatch,
    ) -> Result<FormTemplate, FormError> {
        let changes = TemplateChanges {
            name: patch.name.as_deref().map(Self::check_name).transpose()?,
            description: patch.description.map(Self::normalize_description),
            fields: patch.fields.map(|f| self.check_fields(f)).transpose()?,
        };
        let replacing = changes.fields.is_some();

        let template = self.store.update_template(id, changes).await?;
        if replacing {
            warn!(
                "User {} replaced the fields of form template {}; field ids were regenerated",
                principal.username, id
            );
        } else {
            info!("User {} updated form template {}", principal.username, id);
        }
        Ok(template)
    }

    /// Destructive replace: all existing fields are dropped and `fields` inserted.
    /// Records keep their data; keys whose label disappeared stop validating.
    pub async fn replace_fields(
        &self,
        principal: &Principal,
        id: Uuid,
        fields: Vec<FieldInput>,
    ) -> Result<FormTemplate, FormError> {
        self.update_template(principal, id, TemplatePatch { fields: Some(fields), ..Default::default() })
            .await
    }

    /// Refused with `TemplateInUse` while employee records reference the template
    pub async fn delete_template(&self, principal: &Principal, id: Uuid) -> Result<(), FormError> {
        self.store.delete_template(id).await?;
        info!("User {} deleted form template {}", principal.username, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::forms::{FieldTypeKind, ShapeError};
    use serde_json::json;

    fn service() -> FormService {
        FormService::new(Arc::new(MemoryStore::new()), 10)
    }

    fn principal() -> Principal {
        Principal::new(Uuid::new_v4(), "admin")
    }

    fn input(value: serde_json::Value) -> TemplateInput {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn fields_are_returned_in_order() {
        let service = service();
        let template = service
            .create_template(
                &principal(),
                input(json!({
                    "name": "Staff",
                    "fields": [
                        {"label": "Name", "field_type": "text", "order": 1},
                        {"label": "Age", "field_type": "number", "order": 0}
                    ]
                })),
            )
            .await
            .unwrap();

        let read = service.get_template(template.id).await.unwrap();
        assert_eq!(read.labels(), vec!["Age", "Name"]);
    }

    #[tokio::test]
    async fn choice_fields_without_options_are_rejected_together() {
        let err = service()
            .create_template(
                &principal(),
                input(json!({
                    "name": "Staff",
                    "fields": [
                        {"label": "Team", "field_type": "select"},
                        {"label": "Name", "field_type": "text"},
                        {"label": "Shift", "field_type": "radio", "options": []}
                    ]
                })),
            )
            .await
            .unwrap_err();

        let FormError::Shape(errors) = err else {
            panic!("expected shape errors, got {:?}", err);
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.0.get(&0), Some(&ShapeError::MissingOptions(FieldTypeKind::Select)));
        assert_eq!(errors.0.get(&2), Some(&ShapeError::MissingOptions(FieldTypeKind::Radio)));
    }

    #[tokio::test]
    async fn blank_name_and_field_cap() {
        let service = service();
        assert!(matches!(
            service.create_template(&principal(), input(json!({"name": "  "}))).await,
            Err(FormError::EmptyName)
        ));

        let fields: Vec<_> = (0..11).map(|i| json!({"label": format!("f{}", i), "field_type": "text"})).collect();
        assert!(matches!(
            service
                .create_template(&principal(), input(json!({"name": "Big", "fields": fields})))
                .await,
            Err(FormError::TooManyFields { count: 11, max: 10 })
        ));
    }

    #[tokio::test]
    async fn replace_with_nothing_empties_the_template() {
        let service = service();
        let admin = principal();
        let template = service
            .create_template(
                &admin,
                input(json!({
                    "name": "Staff",
                    "fields": [
                        {"label": "Name", "field_type": "text"},
                        {"label": "Email", "field_type": "email"},
                        {"label": "Start", "field_type": "date"}
                    ]
                })),
            )
            .await
            .unwrap();

        service.replace_fields(&admin, template.id, vec![]).await.unwrap();
        assert!(service.get_template(template.id).await.unwrap().fields.is_empty());
    }

    #[tokio::test]
    async fn patch_without_fields_keeps_field_ids() {
        let service = service();
        let admin = principal();
        let template = service
            .create_template(
                &admin,
                input(json!({
                    "name": "Staff",
                    "description": "before",
                    "fields": [{"label": "Name", "field_type": "text"}]
                })),
            )
            .await
            .unwrap();

        let patch: TemplatePatch = serde_json::from_value(json!({"name": "People", "description": null})).unwrap();
        let updated = service.update_template(&admin, template.id, patch).await.unwrap();

        assert_eq!(updated.name, "People");
        assert_eq!(updated.description, None);
        assert_eq!(updated.fields[0].id, template.fields[0].id);
        assert_eq!(updated.created_by, admin.user_id);
    }

    #[tokio::test]
    async fn absent_description_is_left_alone() {
        let patch: TemplatePatch = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(patch.description, None);

        let patch: TemplatePatch = serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(patch.description, Some(None));
    }

    #[tokio::test]
    async fn unknown_template() {
        let service = service();
        let id = Uuid::new_v4();
        assert!(matches!(service.get_template(id).await, Err(FormError::NotFound(_))));
        assert!(matches!(service.delete_template(&principal(), id).await, Err(FormError::NotFound(_))));
    }
}
