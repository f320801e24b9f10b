use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account as exposed to API clients (no credentials)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Account together with its stored password hash
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// One-to-one profile attached to every account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// New account waiting for the store to assign id and timestamp
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Partial profile update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub phone: Option<String>,
    pub address: Option<String>,
}
