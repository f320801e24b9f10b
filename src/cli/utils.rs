use anyhow::Context;
use serde_json::{json, Value};
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": false, "error": message }))?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Print a single item: pretty JSON, or `key: value` lines
pub fn output_item(output_format: &OutputFormat, item: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
        OutputFormat::Text => {
            for line in text_lines(item) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Print a collection, one summary line per item in text mode
pub fn output_list<F>(output_format: &OutputFormat, items: &Value, empty_message: &str, summarize: F) -> anyhow::Result<()>
where
    F: Fn(&Value) -> String,
{
    let rows = items.as_array().cloned().unwrap_or_default();
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&Value::Array(rows))?),
        OutputFormat::Text if rows.is_empty() => println!("{}", empty_message),
        OutputFormat::Text => {
            for row in &rows {
                println!("{}", summarize(row));
            }
        }
    }
    Ok(())
}

fn text_lines(item: &Value) -> Vec<String> {
    match item {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}: {}", key, s),
                Value::Null => format!("{}: -", key),
                other => format!("{}: {}", key, other),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

/// Parse a request document; JSON first, YAML as the fallback
pub fn parse_document(text: &str) -> anyhow::Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    let value: Value = serde_yaml::from_str(text).context("document is neither valid JSON nor YAML")?;
    Ok(value)
}

/// Read a document from `--file` (`-` or absent means stdin)
pub fn read_document(file: Option<&Path>) -> anyhow::Result<Value> {
    let text = match file {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    parse_document(&text)
}

/// Take a secret from the flag, or read one line from stdin after a prompt
pub fn secret_or_prompt(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    eprint!("{}: ", prompt);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
