use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{output_item, output_success, secret_or_prompt};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Register new user and log in")]
    Register {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, default_value = "", help = "Email")]
        email: String,
        #[arg(long, default_value = "", help = "First name")]
        first_name: String,
        #[arg(long, default_value = "", help = "Last name")]
        last_name: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Change the current user's password")]
    Passwd {
        #[arg(long, help = "Current password (will prompt if not provided)")]
        old: Option<String>,
        #[arg(long, help = "New password (will prompt if not provided)")]
        new: Option<String>,
    },

    #[command(about = "Forget saved tokens")]
    Logout,
}

fn str_field<'a>(data: &'a Value, pointer: &str) -> anyhow::Result<&'a str> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("server response is missing {}", pointer))
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;

    match cmd {
        AuthCommands::Login { username, password } => {
            let password = secret_or_prompt(password, "Password")?;
            session.sign_out();
            let mut client = ApiClient::new(session);
            let data = client
                .post("/api/auth/login", &json!({ "username": username, "password": password }))
                .await?;

            let mut session = client.into_session();
            session.sign_in(
                str_field(&data, "/user/username")?.to_string(),
                str_field(&data, "/access")?.to_string(),
                str_field(&data, "/refresh")?.to_string(),
            );
            save_session(&session)?;

            output_success(&output_format, &format!("Logged in as {}", username), Some(data["user"].clone()))
        }
        AuthCommands::Register { username, email, first_name, last_name, password } => {
            let password = secret_or_prompt(password, "Password")?;
            session.sign_out();
            let mut client = ApiClient::new(session);
            let data = client
                .post(
                    "/api/auth/register",
                    &json!({
                        "username": username,
                        "password": password,
                        "password2": password,
                        "email": email,
                        "first_name": first_name,
                        "last_name": last_name,
                    }),
                )
                .await?;

            let mut session = client.into_session();
            session.sign_in(
                str_field(&data, "/user/username")?.to_string(),
                str_field(&data, "/access")?.to_string(),
                str_field(&data, "/refresh")?.to_string(),
            );
            save_session(&session)?;

            output_success(&output_format, &format!("Registered {}", username), Some(data["user"].clone()))
        }
        AuthCommands::Whoami => {
            let mut client = ApiClient::new(session);
            let user = client.get("/api/auth/whoami").await?;
            output_item(&output_format, &user)
        }
        AuthCommands::Passwd { old, new } => {
            let old = secret_or_prompt(old, "Current password")?;
            let new = secret_or_prompt(new, "New password")?;
            let mut client = ApiClient::new(session);
            client
                .post(
                    "/api/auth/change-password",
                    &json!({ "old_password": old, "new_password": new, "new_password2": new }),
                )
                .await?;
            output_success(&output_format, "Password updated", None)
        }
        AuthCommands::Logout => {
            session.sign_out();
            save_session(&session)?;
            output_success(&output_format, "Logged out", None)
        }
    }
}
