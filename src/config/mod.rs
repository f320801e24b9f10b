use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Secret shipped for local development; production refuses to start with it
pub const DEV_JWT_SECRET: &str = "employee-forms-dev-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub forms: FormsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub refresh_expiry_hours: u64,
    pub password_min_length: usize,
    /// bcrypt work factor, 4..=31
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsConfig {
    pub max_search_results: Option<usize>,
    pub max_fields_per_template: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Preset first, then individual variables
        Self::preset(environment).with_env_overrides()
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Reject settings the server must not run with
    pub fn check(&self) -> Result<(), String> {
        if self.environment == Environment::Production && self.security.jwt_secret == DEV_JWT_SECRET {
            return Err("JWT_SECRET must be set in production".to_string());
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err("DATABASE_URL is required for the postgres backend".to_string());
        }
        if !(4..=31).contains(&self.security.password_hash_cost) {
            return Err("SECURITY_PASSWORD_HASH_COST must be between 4 and 31".to_string());
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
            // a configured URL implies postgres unless the backend is pinned
            if env::var("DATABASE_BACKEND").is_err() {
                self.database.backend = StoreBackend::Postgres;
            }
        }
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            self.database.backend = parse_backend(&v).unwrap_or(self.database.backend);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_AUTO_MIGRATE") {
            self.database.auto_migrate = v.parse().unwrap_or(self.database.auto_migrate);
        }

        // API overrides
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET").or_else(|_| env::var("SECURITY_JWT_SECRET")) {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_EXPIRY_HOURS") {
            self.security.refresh_expiry_hours = v.parse().unwrap_or(self.security.refresh_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_HASH_COST") {
            self.security.password_hash_cost = v.parse().unwrap_or(self.security.password_hash_cost);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_MIN_LENGTH") {
            self.security.password_min_length = v.parse().unwrap_or(self.security.password_min_length);
        }

        // Forms overrides
        if let Ok(v) = env::var("FORMS_MAX_SEARCH_RESULTS") {
            self.forms.max_search_results = v.parse().ok();
        }
        if let Ok(v) = env::var("FORMS_MAX_FIELDS_PER_TEMPLATE") {
            self.forms.max_fields_per_template = v.parse().unwrap_or(self.forms.max_fields_per_template);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                auto_migrate: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                refresh_expiry_hours: 24 * 7,
                password_min_length: 8,
                password_hash_cost: 4,
            },
            forms: FormsConfig {
                max_search_results: None,
                max_fields_per_template: 200,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                auto_migrate: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 4,
                refresh_expiry_hours: 24,
                password_min_length: 8,
                password_hash_cost: 10,
            },
            forms: FormsConfig {
                max_search_results: Some(1000),
                max_fields_per_template: 100,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                auto_migrate: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 1,
                refresh_expiry_hours: 24,
                password_min_length: 10,
                password_hash_cost: bcrypt::DEFAULT_COST,
            },
            forms: FormsConfig {
                max_search_results: Some(500),
                max_fields_per_template: 100,
            },
        }
    }
}

fn parse_backend(value: &str) -> Option<StoreBackend> {
    match value.to_ascii_lowercase().as_str() {
        "memory" | "mem" => Some(StoreBackend::Memory),
        "postgres" | "postgresql" | "pg" => Some(StoreBackend::Postgres),
        _ => None,
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.forms.max_search_results, None);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert!(!config.database.auto_migrate);
        assert_eq!(config.forms.max_search_results, Some(500));
    }

    #[test]
    fn production_refuses_dev_secret() {
        let mut config = AppConfig::production();
        config.database.url = Some("postgres://localhost/staff".to_string());
        assert!(config.check().unwrap_err().contains("JWT_SECRET"));

        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.check().is_ok());
    }

    #[test]
    fn postgres_backend_needs_url() {
        let config = AppConfig::staging();
        assert!(config.check().unwrap_err().contains("DATABASE_URL"));
    }

    #[test]
    fn hash_cost_must_suit_bcrypt() {
        let mut config = AppConfig::development();
        config.security.password_hash_cost = 2;
        assert!(config.check().unwrap_err().contains("HASH_COST"));

        assert_eq!(AppConfig::production().security.password_hash_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn backend_names() {
        assert_eq!(parse_backend("PG"), Some(StoreBackend::Postgres));
        assert_eq!(parse_backend("memory"), Some(StoreBackend::Memory));
        assert_eq!(parse_backend("sqlite"), None);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.database.url = Some("postgres://user:pw@localhost/staff".to_string());
        let text = serde_json::to_string(&config).unwrap();
        assert!(!text.contains(DEV_JWT_SECRET));
        assert!(!text.contains("pw@"));
    }
}
