use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

/// Persisted CLI state: which server to talk to and the current tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server_url: String,
    pub username: Option<String>,
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: None,
            access: None,
            refresh: None,
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }
}

impl SessionConfig {
    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }

    pub fn sign_in(&mut self, username: String, access: String, refresh: String) {
        self.username = Some(username);
        self.access = Some(access);
        self.refresh = Some(refresh);
    }

    pub fn sign_out(&mut self) {
        self.username = None;
        self.access = None;
        self.refresh = None;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("STAFF_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("employee-forms").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<SessionConfig> {
    let session_file = get_config_dir()?.join("session.json");

    if !session_file.exists() {
        return Ok(SessionConfig::default());
    }

    let content = fs::read_to_string(session_file)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_session(session: &SessionConfig) -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join("session.json");
    fs::write(session_file, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

pub async fn ping_server(server_url: &str) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", server_url.trim_end_matches('/'));

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}
