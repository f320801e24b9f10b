use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    hash_password, validate_password, verify_password, AuthError, PasswordPolicy, TokenIssuer, TokenType,
};
use crate::database::models::{ProfileChanges, User, UserDraft, UserProfile};
use crate::database::{DatabaseError, FormStore};
use crate::forms::is_valid_email;
use crate::types::Principal;

/// Body of `POST /api/auth/register`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/auth/change-password`
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub new_password2: String,
}

/// Account plus a fresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

/// Accounts, credentials and profiles
pub struct UserService {
    store: Arc<dyn FormStore>,
    issuer: TokenIssuer,
    policy: PasswordPolicy,
}

impl UserService {
    pub fn new(store: Arc<dyn FormStore>, issuer: TokenIssuer, policy: PasswordPolicy) -> Self {
        Self { store, issuer, policy }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    fn check_new_password(
        &self,
        password: &str,
        confirmation: &str,
        username: &str,
        field: &'static str,
        confirm_field: &'static str,
    ) -> Result<(), AuthError> {
        if password != confirmation {
            return Err(AuthError::PasswordMismatch { field: confirm_field });
        }
        let problems = validate_password(&self.policy, password, username);
        if !problems.is_empty() {
            return Err(AuthError::WeakPassword { field, problems });
        }
        Ok(())
    }

    /// bcrypt is deliberately slow, so it runs on the blocking pool
    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.policy.hash_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    async fn verify(&self, password: &str, stored: &str) -> Result<bool, AuthError> {
        let (password, stored) = (password.to_string(), stored.to_string());
        tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn session(&self, user: User) -> Result<AuthSession, AuthError> {
        let pair = self.issuer.issue_pair(&user)?;
        Ok(AuthSession { user, access: pair.access, refresh: pair.refresh })
    }

    /// Create the account and its empty profile, then sign the user in
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        let email = input.email.trim().to_string();
        if !email.is_empty() && !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        self.check_new_password(&input.password, &input.password2, &username, "password", "password2")?;
        let password_hash = self.hash(&input.password).await?;

        let user = self
            .store
            .create_user(UserDraft {
                username: username.clone(),
                email,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => AuthError::UsernameTaken(username.clone()),
                other => AuthError::Database(other),
            })?;

        info!("Registered user {} ({})", user.username, user.id);
        self.session(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let Some(credentials) = self.store.find_user_by_username(input.username.trim()).await? else {
            warn!("Login failed for unknown user '{}'", input.username);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(&input.password, &credentials.password_hash).await? {
            warn!("Login failed for user '{}'", credentials.user.username);
            return Err(AuthError::InvalidCredentials);
        }

        info!("User {} logged in", credentials.user.username);
        self.session(credentials.user)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.issuer.verify(refresh_token, TokenType::Refresh)?;
        let credentials = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or(AuthError::UnknownUser(claims.sub))?;

        Ok(self.issuer.issue(&credentials.user, TokenType::Access)?)
    }

    pub async fn whoami(&self, principal: &Principal) -> Result<User, AuthError> {
        self.store
            .get_user(principal.user_id)
            .await?
            .map(|c| c.user)
            .ok_or(AuthError::UnknownUser(principal.user_id))
    }

    pub async fn change_password(&self, principal: &Principal, input: ChangePasswordInput) -> Result<(), AuthError> {
        let credentials = self
            .store
            .get_user(principal.user_id)
            .await?
            .ok_or(AuthError::UnknownUser(principal.user_id))?;

        if !self.verify(&input.old_password, &credentials.password_hash).await? {
            return Err(AuthError::WrongPassword);
        }
        self.check_new_password(
            &input.new_password,
            &input.new_password2,
            &credentials.user.username,
            "new_password",
            "new_password2",
        )?;

        let password_hash = self.hash(&input.new_password).await?;
        self.store.update_password_hash(principal.user_id, password_hash).await?;
        info!("User {} changed their password", principal.username);
        Ok(())
    }

    pub async fn profile(&self, principal: &Principal) -> Result<UserProfile, AuthError> {
        Ok(self.store.get_profile(principal.user_id).await?)
    }

    pub async fn update_profile(&self, principal: &Principal, changes: ProfileChanges) -> Result<UserProfile, AuthError> {
        Ok(self.store.update_profile(principal.user_id, changes).await?)
    }
}
