use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::client::ApiClient;
use crate::cli::config::load_session;
use crate::cli::utils::{output_item, output_list, output_success, read_document};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum EmployeesCommands {
    #[command(about = "List employees, optionally searching their data")]
    List {
        #[arg(long, short, help = "Case-insensitive substring to look for in any value")]
        search: Option<String>,
        #[arg(long, help = "Only records of this template")]
        template: Option<String>,
    },

    #[command(about = "Show one employee record")]
    Get {
        #[arg(help = "Employee id")]
        id: String,
    },

    #[command(about = "Create an employee from {form_template_id, data}")]
    Create {
        #[arg(long, short, help = "Document file (stdin when omitted or '-')")]
        file: Option<PathBuf>,
    },

    #[command(about = "Replace an employee's data")]
    Update {
        #[arg(help = "Employee id")]
        id: String,
        #[arg(long, short, help = "Document file (stdin when omitted or '-')")]
        file: Option<PathBuf>,
    },

    #[command(about = "Delete an employee record")]
    Delete {
        #[arg(help = "Employee id")]
        id: String,
    },
}

fn summarize(employee: &serde_json::Value) -> String {
    let values: Vec<String> = employee["data"]
        .as_object()
        .map(|data| {
            data.iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => format!("{}={}", k, s),
                    other => format!("{}={}", k, other),
                })
                .collect()
        })
        .unwrap_or_default();
    format!("{}  {}", employee["id"].as_str().unwrap_or("-"), values.join(", "))
}

fn list_path(search: Option<&str>, template: Option<&str>) -> anyhow::Result<String> {
    let mut url = url::Url::parse("http://placeholder/api/employees")?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            query.append_pair("search", search);
        }
        if let Some(template) = template.filter(|t| !t.is_empty()) {
            query.append_pair("form_template_id", template);
        }
    }
    Ok(match url.query() {
        Some(q) if !q.is_empty() => format!("{}?{}", url.path(), q),
        _ => url.path().to_string(),
    })
}

pub async fn handle(cmd: EmployeesCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut client = ApiClient::new(load_session()?);

    match cmd {
        EmployeesCommands::List { search, template } => {
            let path = list_path(search.as_deref(), template.as_deref())?;
            let employees = client.get(&path).await?;
            output_list(&output_format, &employees, "No employees", summarize)
        }
        EmployeesCommands::Get { id } => {
            let employee = client.get(&format!("/api/employees/{}", id)).await?;
            output_item(&output_format, &employee)
        }
        EmployeesCommands::Create { file } => {
            let document = read_document(file.as_deref())?;
            let employee = client.post("/api/employees", &document).await?;
            output_success(&output_format, &format!("Created employee {}", summarize(&employee)), Some(employee))
        }
        EmployeesCommands::Update { id, file } => {
            let document = read_document(file.as_deref())?;
            let employee = client.put(&format!("/api/employees/{}", id), &document).await?;
            output_success(&output_format, &format!("Updated employee {}", summarize(&employee)), Some(employee))
        }
        EmployeesCommands::Delete { id } => {
            client.delete(&format!("/api/employees/{}", id)).await?;
            output_success(&output_format, &format!("Deleted employee {}", id), None)
        }
    }
}
