use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    assemble_templates, EmployeeRow, FormFieldRow, FormTemplateRow, ProfileChanges, User, UserCredentials,
    UserDraft, UserProfile,
};
use super::store::FormStore;
use crate::forms::{Employee, EmployeeDraft, EmployeeFilter, FieldDraft, FormTemplate, TemplateChanges, TemplateDraft};

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

/// Tables created by `PgStore::migrate`
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        "id" UUID PRIMARY KEY,
        "username" TEXT NOT NULL UNIQUE,
        "email" TEXT NOT NULL DEFAULT '',
        "first_name" TEXT NOT NULL DEFAULT '',
        "last_name" TEXT NOT NULL DEFAULT '',
        "password_hash" TEXT NOT NULL,
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_profiles (
        "user_id" UUID PRIMARY KEY REFERENCES users("id") ON DELETE CASCADE,
        "phone" TEXT NOT NULL DEFAULT '',
        "address" TEXT NOT NULL DEFAULT '',
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS form_templates (
        "id" UUID PRIMARY KEY,
        "name" TEXT NOT NULL,
        "description" TEXT,
        "created_by" UUID NOT NULL REFERENCES users("id") ON DELETE CASCADE,
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
        "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS form_fields (
        "id" UUID PRIMARY KEY,
        "form_template_id" UUID NOT NULL REFERENCES form_templates("id") ON DELETE CASCADE,
        "label" TEXT NOT NULL,
        "field_type" TEXT NOT NULL,
        "required" BOOLEAN NOT NULL DEFAULT false,
        "options" TEXT[],
        "sort_order" INTEGER NOT NULL DEFAULT 0 CHECK ("sort_order" >= 0),
        "position" INTEGER NOT NULL
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS form_fields_template_idx ON form_fields ("form_template_id")"#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        "id" UUID PRIMARY KEY,
        "form_template_id" UUID NOT NULL REFERENCES form_templates("id") ON DELETE RESTRICT,
        "data" JSONB NOT NULL,
        "created_by" UUID NOT NULL REFERENCES users("id") ON DELETE CASCADE,
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
        "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS employees_template_idx ON employees ("form_template_id")"#,
];

const TEMPLATE_COLUMNS: &str = r#""id", "name", "description", "created_by", "created_at", "updated_at""#;
const FIELD_COLUMNS: &str =
    r#""id", "form_template_id", "label", "field_type", "required", "options", "sort_order", "position""#;
const EMPLOYEE_COLUMNS: &str = r#""id", "form_template_id", "data", "created_by", "created_at", "updated_at""#;
const USER_COLUMNS: &str =
    r#"u."id", u."username", u."email", u."first_name", u."last_name", u."created_at", u."password_hash""#;

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn sql_state(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn order_column(value: u32) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| DatabaseError::QueryError(format!("field order {} out of range", value)))
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes when missing
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    async fn insert_fields(
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
        fields: &[FieldDraft],
    ) -> Result<(), DatabaseError> {
        for (position, field) in fields.iter().enumerate() {
            sqlx::query(&format!(
                "INSERT INTO form_fields ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                FIELD_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(template_id)
            .bind(&field.label)
            .bind(field.kind.as_str())
            .bind(field.required)
            .bind(&field.options)
            .bind(order_column(field.order)?)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn load_template(&self, id: Uuid) -> Result<Option<FormTemplate>, DatabaseError> {
        let row = sqlx::query_as::<_, FormTemplateRow>(&format!(
            "SELECT {} FROM form_templates WHERE \"id\" = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fields = sqlx::query_as::<_, FormFieldRow>(&format!(
            "SELECT {} FROM form_fields WHERE \"form_template_id\" = $1 ORDER BY \"sort_order\", \"position\"",
            FIELD_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_template(fields).map(Some)
    }

    async fn require_template(&self, id: Uuid) -> Result<FormTemplate, DatabaseError> {
        self.load_template(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Form template {}", id)))
    }
}

#[async_trait]
impl FormStore for PgStore {
    async fn create_template(&self, draft: TemplateDraft) -> Result<FormTemplate, DatabaseError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO form_templates ("id", "name", "description", "created_by") VALUES ($1, $2, $3, $4)"#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.created_by)
        .execute(&mut *tx)
        .await?;

        Self::insert_fields(&mut tx, id, &draft.fields).await?;
        tx.commit().await?;

        debug!("Created form template {} with {} field(s)", id, draft.fields.len());
        self.require_template(id).await
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<FormTemplate>, DatabaseError> {
        self.load_template(id).await
    }

    async fn list_templates(&self) -> Result<Vec<FormTemplate>, DatabaseError> {
        let templates = sqlx::query_as::<_, FormTemplateRow>(&format!(
            "SELECT {} FROM form_templates ORDER BY \"created_at\", \"id\"",
            TEMPLATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let fields = sqlx::query_as::<_, FormFieldRow>(&format!(
            "SELECT {} FROM form_fields ORDER BY \"form_template_id\", \"sort_order\", \"position\"",
            FIELD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        assemble_templates(templates, fields)
    }

    async fn update_template(&self, id: Uuid, changes: TemplateChanges) -> Result<FormTemplate, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(r#"SELECT "id" FROM form_templates WHERE "id" = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound(format!("Form template {}", id)));
        }

        let (set_description, description) = match changes.description {
            Some(d) => (true, d),
            None => (false, None),
        };

        sqlx::query(
            r#"
            UPDATE form_templates
            SET "name" = COALESCE($2, "name"),
                "description" = CASE WHEN $3 THEN $4 ELSE "description" END,
                "updated_at" = now()
            WHERE "id" = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(set_description)
        .bind(&description)
        .execute(&mut *tx)
        .await?;

        if let Some(fields) = &changes.fields {
            let removed = sqlx::query(r#"DELETE FROM form_fields WHERE "form_template_id" = $1"#)
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            Self::insert_fields(&mut tx, id, fields).await?;
            debug!("Replaced {} field(s) of template {} with {}", removed, id, fields.len());
        }

        tx.commit().await?;
        self.require_template(id).await
    }

    async fn delete_template(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(r#"SELECT "id" FROM form_templates WHERE "id" = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound(format!("Form template {}", id)));
        }

        let references =
            sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM employees WHERE "form_template_id" = $1"#)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if references > 0 {
            return Err(DatabaseError::TemplateInUse { template_id: id, references });
        }

        match sqlx::query(r#"DELETE FROM form_templates WHERE "id" = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(_) => {}
            // an employee committed between the count and the delete
            Err(e) if sql_state(&e).as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                return Err(DatabaseError::TemplateInUse { template_id: id, references: 1 });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_templates(&self) -> Result<i64, DatabaseError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM form_templates")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee, DatabaseError> {
        let result = sqlx::query_as::<_, EmployeeRow>(&format!(
            r#"INSERT INTO employees ("id", "form_template_id", "data", "created_by")
               VALUES ($1, $2, $3, $4) RETURNING {}"#,
            EMPLOYEE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(draft.form_template_id)
        .bind(Value::Object(draft.data))
        .bind(draft.created_by)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(e) if sql_state(&e).as_deref() == Some(FOREIGN_KEY_VIOLATION) => Err(DatabaseError::NotFound(
                format!("Form template {}", draft.form_template_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, DatabaseError> {
        sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {} FROM employees WHERE \"id\" = $1",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Employee::try_from)
        .transpose()
    }

    async fn update_employee_data(&self, id: Uuid, data: Map<String, Value>) -> Result<Employee, DatabaseError> {
        sqlx::query_as::<_, EmployeeRow>(&format!(
            r#"UPDATE employees SET "data" = $2, "updated_at" = now() WHERE "id" = $1 RETURNING {}"#,
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .bind(Value::Object(data))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Employee {}", id)))?
        .try_into()
    }

    async fn delete_employee(&self, id: Uuid) -> Result<(), DatabaseError> {
        let deleted = sqlx::query(r#"DELETE FROM employees WHERE "id" = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DatabaseError::NotFound(format!("Employee {}", id)));
        }
        Ok(())
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, DatabaseError> {
        sqlx::query_as::<_, EmployeeRow>(&format!(
            r#"SELECT {} FROM employees
               WHERE ($1::uuid IS NULL OR "form_template_id" = $1)
                 AND ($2::uuid IS NULL OR "created_by" = $2)
               ORDER BY "created_at", "id""#,
            EMPLOYEE_COLUMNS
        ))
        .bind(filter.form_template_id)
        .bind(filter.created_by)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Employee::try_from)
        .collect()
    }

    async fn count_employees(&self) -> Result<i64, DatabaseError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_user(&self, draft: UserDraft) -> Result<User, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users ("id", "username", "email", "first_name", "last_name", "password_hash")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING "id", "username", "email", "first_name", "last_name", "created_at"
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.username)
        .bind(&draft.email)
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.password_hash)
        .fetch_one(&mut *tx)
        .await;

        let user = match inserted {
            Ok(user) => user,
            Err(e) if sql_state(&e).as_deref() == Some(UNIQUE_VIOLATION) => {
                return Err(DatabaseError::Conflict(format!("username '{}' is already taken", draft.username)));
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query(r#"INSERT INTO user_profiles ("user_id") VALUES ($1)"#)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserCredentials>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {} FROM users u WHERE u.\"username\" = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserCredentials>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {} FROM users u WHERE u.\"id\" = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: String) -> Result<(), DatabaseError> {
        let updated = sqlx::query(r#"UPDATE users SET "password_hash" = $2 WHERE "id" = $1"#)
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(DatabaseError::NotFound(format!("User {}", user_id)));
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, DatabaseError> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT "user_id", "phone", "address", "created_at" FROM user_profiles WHERE "user_id" = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Profile for user {}", user_id)))
    }

    async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<UserProfile, DatabaseError> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE user_profiles
            SET "phone" = COALESCE($2, "phone"),
                "address" = COALESCE($3, "address")
            WHERE "user_id" = $1
            RETURNING "user_id", "phone", "address", "created_at"
            "#,
        )
        .bind(user_id)
        .bind(changes.phone)
        .bind(changes.address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Profile for user {}", user_id)))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
