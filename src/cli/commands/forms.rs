use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::client::ApiClient;
use crate::cli::config::load_session;
use crate::cli::utils::{output_item, output_list, output_success, read_document};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum FormsCommands {
    #[command(about = "List form templates")]
    List,

    #[command(about = "Show one form template with its fields")]
    Get {
        #[arg(help = "Template id")]
        id: String,
    },

    #[command(about = "Create a template from a JSON or YAML document")]
    Create {
        #[arg(long, short, help = "Document file (stdin when omitted or '-')")]
        file: Option<PathBuf>,
    },

    #[command(about = "Update a template; a `fields` key replaces every field")]
    Update {
        #[arg(help = "Template id")]
        id: String,
        #[arg(long, short, help = "Document file (stdin when omitted or '-')")]
        file: Option<PathBuf>,
    },

    #[command(about = "Delete a template that no employee references")]
    Delete {
        #[arg(help = "Template id")]
        id: String,
    },
}

fn summarize(template: &serde_json::Value) -> String {
    format!(
        "{}  {}  ({} fields)",
        template["id"].as_str().unwrap_or("-"),
        template["name"].as_str().unwrap_or("-"),
        template["fields"].as_array().map_or(0, Vec::len)
    )
}

pub async fn handle(cmd: FormsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut client = ApiClient::new(load_session()?);

    match cmd {
        FormsCommands::List => {
            let templates = client.get("/api/forms").await?;
            output_list(&output_format, &templates, "No form templates", summarize)
        }
        FormsCommands::Get { id } => {
            let template = client.get(&format!("/api/forms/{}", id)).await?;
            output_item(&output_format, &template)
        }
        FormsCommands::Create { file } => {
            let document = read_document(file.as_deref())?;
            let template = client.post("/api/forms", &document).await?;
            output_success(&output_format, &format!("Created template {}", summarize(&template)), Some(template))
        }
        FormsCommands::Update { id, file } => {
            let document = read_document(file.as_deref())?;
            let template = client.put(&format!("/api/forms/{}", id), &document).await?;
            output_success(&output_format, &format!("Updated template {}", summarize(&template)), Some(template))
        }
        FormsCommands::Delete { id } => {
            client.delete(&format!("/api/forms/{}", id)).await?;
            output_success(&output_format, &format!("Deleted template {}", id), None)
        }
    }
}
