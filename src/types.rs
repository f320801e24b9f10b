/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated actor behind a call; threaded explicitly into every
/// service operation that records a creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

impl Principal {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self { user_id, username: username.into() }
    }
}
