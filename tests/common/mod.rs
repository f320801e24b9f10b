use std::sync::{mpsc, Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use employee_forms_api::app::{app, AppState};
use employee_forms_api::config::{AppConfig, Environment};
use employee_forms_api::database::MemoryStore;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

impl TestServer {
    /// Serve the real router over the in-memory store on its own runtime thread,
    /// so it outlives the per-test runtimes
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("test server runtime");

            runtime.block_on(async move {
                let mut config = AppConfig::preset(Environment::Development);
                config.api.enable_request_logging = false;
                config.forms.max_fields_per_template = 20;

                let state = AppState::new(Arc::new(MemoryStore::new()), &config).expect("app state");
                let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
                    .await
                    .expect("bind test port");
                let _ = ready_tx.send(());

                axum::serve(listener, app(state, &config)).await.expect("test server");
            });
        });

        ready_rx
            .recv_timeout(Duration::from_secs(10))
            .context("test server did not bind")?;

        Ok(Self { port, base_url })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to start test server"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// JSON client bound to the test server, optionally carrying a bearer token
pub struct Api {
    client: reqwest::Client,
    base_url: String,
    pub token: Option<String>,
}

impl Api {
    pub async fn anonymous() -> Result<Self> {
        let server = ensure_server().await?;
        Ok(Self { client: reqwest::Client::new(), base_url: server.base_url.clone(), token: None })
    }

    /// Register a fresh user and keep its access token
    pub async fn signed_in() -> Result<(Self, Value)> {
        let mut api = Self::anonymous().await?;
        let username = unique("user");
        let (status, body) = api
            .post(
                "/api/auth/register",
                json!({
                    "username": username,
                    "password": "integration-pass",
                    "password2": "integration-pass",
                    "email": format!("{}@example.com", username),
                    "first_name": "Test",
                    "last_name": "User"
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        api.token = body["data"]["access"].as_str().map(str::to_string);
        Ok((api, body["data"].clone()))
    }

    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, body))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, None).await
    }

    /// Create a template and return its id
    pub async fn create_template(&self, name: &str, fields: Value) -> Result<String> {
        let (status, body) = self.post("/api/forms", json!({ "name": name, "fields": fields })).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create template failed: {} {}", status, body);
        body["data"]["id"].as_str().map(str::to_string).context("template id")
    }
}

/// Name that cannot collide with other tests sharing the server
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[allow(dead_code)]
pub fn labels(template: &Value) -> Vec<String> {
    template["fields"]
        .as_array()
        .map(|fields| fields.iter().filter_map(|f| f["label"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
