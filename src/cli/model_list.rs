//! Model listing functionality
//!
//! Prints the models installed on the Ollama server, newest first.

use std::error::Error;

use chrono::{DateTime, Utc};

use crate::api::models::{fetch_models, format_size, sort_models};
use crate::api::ModelInfo;
use crate::core::config::Config;

pub async fn list_models(host: &str, config: &Config) -> Result<(), Box<dyn Error>> {
    println!("🤖 Available Models on {host}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(default_model) = &config.default_model {
        println!("🎯 Default model: {default_model} (from config)");
        println!();
    }

    let client = reqwest::Client::new();
    let tags = fetch_models(&client, host).await.map_err(|err| {
        format!("{err}\n\nPlease ensure the Ollama server is running (`ollama serve`).")
    })?;

    if tags.models.is_empty() {
        println!("No models installed. Pull one with `ollama pull llama3.2`.");
        return Ok(());
    }

    println!(
        "Found {} models (sorted newest first):",
        tags.models.len()
    );
    println!();

    let mut models = tags.models;
    sort_models(&mut models);
    for model in &models {
        for line in describe_model(model) {
            println!("{line}");
        }
        println!();
    }

    Ok(())
}

fn describe_model(model: &ModelInfo) -> Vec<String> {
    let mut lines = vec![format!("  • {}", model.name)];
    if let Some(details) = &model.details {
        let summary: Vec<&str> = [
            details.family.as_deref(),
            details.parameter_size.as_deref(),
            details.quantization_level.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
        if !summary.is_empty() {
            lines.push(format!("    Details: {}", summary.join(", ")));
        }
    }
    if let Some(size) = model.size {
        lines.push(format!("    Size: {}", format_size(size)));
    }
    if let Some(modified) = model.modified_at.as_deref().filter(|m| !m.is_empty()) {
        match DateTime::parse_from_rfc3339(modified) {
            Ok(dt) => lines.push(format!(
                "    Modified: {}",
                dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC")
            )),
            Err(_) => lines.push(format!("    Modified: {modified}")),
        }
    }
    lines
}
