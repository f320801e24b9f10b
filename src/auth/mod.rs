// auth/mod.rs - Token issuance and password handling
//
// Everything here is stateless: the issuer only needs the security section
// of the configuration, and bcrypt hashes carry their own salt and cost.

pub mod password;
pub mod token;

pub use password::{hash_password, validate_password, verify_password, PasswordPolicy};
pub use token::{Claims, JwtError, TokenIssuer, TokenPair, TokenType};

use thiserror::Error;

use crate::database::DatabaseError;

/// Account and credential failures. Variants that concern one request field
/// carry its name so the HTTP layer can report it inline.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password fields didn't match")]
    PasswordMismatch { field: &'static str },

    #[error("Old password is not correct")]
    WrongPassword,

    #[error("{}", problems.join(" "))]
    WeakPassword { field: &'static str, problems: Vec<String> },

    #[error("This field is required")]
    MissingField(&'static str),

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("A user with that username already exists")]
    UsernameTaken(String),

    #[error("User {0} no longer exists")]
    UnknownUser(uuid::Uuid),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
