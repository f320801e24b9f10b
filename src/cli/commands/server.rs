use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{load_session, ping_server, save_session, ServerStatus};
use crate::cli::utils::{output_error, output_item, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Point the CLI at a server (clears any saved tokens)")]
    Set {
        #[arg(help = "Server URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the configured server and login state")]
    Show,

    #[command(about = "Check server health via /health")]
    Health,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;

    match cmd {
        ServerCommands::Set { url } => {
            let parsed = url::Url::parse(&url).map_err(|e| anyhow::anyhow!("invalid server URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("server URL must use http or https");
            }

            session.server_url = url.trim_end_matches('/').to_string();
            session.sign_out();
            session.status = ServerStatus::Unknown;
            save_session(&session)?;

            output_success(
                &output_format,
                &format!("Server set to {}", session.server_url),
                Some(json!({ "server_url": session.server_url })),
            )
        }
        ServerCommands::Show => output_item(
            &output_format,
            &json!({
                "server_url": session.server_url,
                "username": session.username,
                "status": session.status,
                "last_ping": session.last_ping,
            }),
        ),
        ServerCommands::Health => {
            let status = ping_server(&session.server_url).await;
            session.update_ping(status);
            save_session(&session)?;

            match status {
                ServerStatus::Up => output_success(&output_format, &format!("{} is up", session.server_url), None),
                _ => {
                    output_error(&output_format, &format!("{} is not responding", session.server_url))?;
                    anyhow::bail!("server health check failed")
                }
            }
        }
    }
}
