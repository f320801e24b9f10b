use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub username: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Expected a {expected:?} token")]
    WrongType { expected: TokenType },

    #[error("Token lifetime of {0} hours is out of range")]
    InvalidLifetime(u64),
}

fn lifetime(hours: u64) -> Result<Duration, JwtError> {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .ok_or(JwtError::InvalidLifetime(hours))
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and checks HS256 tokens with the configured secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(security: &SecurityConfig) -> Result<Self, JwtError> {
        if security.jwt_secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        let secret = security.jwt_secret.as_bytes();

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: lifetime(security.jwt_expiry_hours)?,
            refresh_ttl: lifetime(security.refresh_expiry_hours)?,
        })
    }

    pub fn issue(&self, user: &User, token_type: TokenType) -> Result<String, JwtError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| JwtError::TokenGeneration("expiry overflows the calendar".to_string()))?;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue(user, TokenType::Access)?,
            refresh: self.issue(user, TokenType::Refresh)?,
        })
    }

    /// Decode a token and insist on its type
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| JwtError::Invalid(e.to_string()))?
            .claims;

        if claims.token_type != expected {
            return Err(JwtError::WrongType { expected });
        }
        Ok(claims)
    }
}
