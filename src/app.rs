use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    extract::State,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{JwtError, PasswordPolicy, TokenIssuer};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::FormStore;
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::{EmployeeService, FormService, UserService};

/// Shared handler state; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FormStore>,
    pub forms: Arc<FormService>,
    pub employees: Arc<EmployeeService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(store: Arc<dyn FormStore>, config: &AppConfig) -> Result<Self, JwtError> {
        let issuer = TokenIssuer::new(&config.security)?;
        let policy = PasswordPolicy::new(config.security.password_min_length, config.security.password_hash_cost);

        Ok(Self {
            forms: Arc::new(FormService::new(store.clone(), config.forms.max_fields_per_template)),
            employees: Arc::new(EmployeeService::new(store.clone(), config.forms.max_search_results)),
            users: Arc::new(UserService::new(store.clone(), issuer, policy)),
            store,
        })
    }
}

/// Full router with global middleware applied per configuration
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token/refresh", post(auth::refresh))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(form_routes())
        .merge(employee_routes())
        .route("/api/dashboard", get(handlers::protected::dashboard::get))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/profile", get(auth::profile_get).put(auth::profile_put))
}

fn form_routes() -> Router<AppState> {
    use handlers::protected::forms;

    Router::new()
        .route("/api/forms", get(forms::list).post(forms::create))
        .route(
            "/api/forms/:id",
            get(forms::get).put(forms::update).delete(forms::delete),
        )
}

fn employee_routes() -> Router<AppState> {
    use handlers::protected::employees;

    Router::new()
        .route("/api/employees", get(employees::list).post(employees::create))
        .route(
            "/api/employees/:id",
            get(employees::get).put(employees::update).delete(employees::delete),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Employee Forms API",
            "version": version,
            "description": "Dynamic form templates and employee records",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/api/auth/register, /api/auth/login, /api/auth/token/refresh (public - token acquisition)",
                "auth": "/api/auth/whoami, /api/auth/change-password, /api/auth/profile (protected)",
                "forms": "/api/forms[/:id] (protected)",
                "employees": "/api/employees[/:id][?search=] (protected)",
                "dashboard": "/api/dashboard (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
