//! Diagnostic logging via `tracing`.
//!
//! The interactive UI owns the terminal, so diagnostics go to a file there;
//! headless commands log to stderr. `RUST_LOG` overrides the default filter.

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn,ollama_chat=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Default diagnostics file for interactive sessions.
pub fn default_log_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "ollama-chat", "ollama-chat")
        .map(|dirs| dirs.data_local_dir().join("ollama-chat.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(target: LogTarget) -> Result<(), Box<dyn Error>> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .try_init()
                .map_err(|err| -> Box<dyn Error> { err })?;
        }
        LogTarget::File(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|err| -> Box<dyn Error> { err })?;
        }
    }
    Ok(())
}
