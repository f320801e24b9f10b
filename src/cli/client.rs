use anyhow::anyhow;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use super::config::{save_session, SessionConfig};

/// Thin JSON client over the HTTP API that unwraps the response envelope
pub struct ApiClient {
    http: reqwest::Client,
    session: SessionConfig,
}

impl ApiClient {
    pub fn new(session: SessionConfig) -> Self {
        Self { http: reqwest::Client::new(), session }
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn into_session(self) -> SessionConfig {
        self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.server_url.trim_end_matches('/'), path)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> anyhow::Result<reqwest::Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = &self.session.access {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send a request, refreshing the access token once on 401
    pub async fn request(&mut self, method: Method, path: &str, body: Option<&Value>) -> anyhow::Result<Value> {
        let mut response = self.send(method.clone(), path, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.session.refresh.is_some() && self.refresh().await? {
            response = self.send(method, path, body).await?;
        }

        unwrap_envelope(response.status(), response.text().await?)
    }

    async fn refresh(&mut self) -> anyhow::Result<bool> {
        let Some(refresh) = self.session.refresh.clone() else {
            return Ok(false);
        };

        let response = self
            .http
            .post(self.url("/api/auth/token/refresh"))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(false);
        }

        let data = unwrap_envelope(response.status(), response.text().await?)?;
        let Some(access) = data.get("access").and_then(Value::as_str) else {
            return Ok(false);
        };

        self.session.access = Some(access.to_string());
        save_session(&self.session)?;
        Ok(true)
    }

    pub async fn get(&mut self, path: &str) -> anyhow::Result<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&mut self, path: &str, body: &Value) -> anyhow::Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&mut self, path: &str, body: &Value) -> anyhow::Result<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&mut self, path: &str) -> anyhow::Result<Value> {
        self.request(Method::DELETE, path, None).await
    }
}

/// `data` of a success envelope, or an error carrying the server's message
/// and any field errors
pub fn unwrap_envelope(status: StatusCode, text: String) -> anyhow::Result<Value> {
    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        if status.is_success() {
            return Ok(Value::Null);
        }
        return Err(anyhow!("HTTP {}", status));
    }

    let body: Value = serde_json::from_str(&text).map_err(|_| anyhow!("HTTP {}: {}", status, text.trim()))?;

    if status.is_success() {
        return Ok(body.get("data").cloned().unwrap_or(body));
    }

    let message = body.get("message").and_then(Value::as_str).unwrap_or("request failed");
    let mut error = format!("{} ({})", message, status.as_u16());
    if let Some(fields) = body.get("field_errors").and_then(Value::as_object) {
        for (field, reason) in fields {
            error.push_str(&format!("\n  {}: {}", field, reason.as_str().unwrap_or_default()));
        }
    }
    Err(anyhow!(error))
}
