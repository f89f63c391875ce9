use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::message::{Message, Role};

/// Appends finished chat messages to a plain-text file, formatted the way
/// they appear on screen.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        if let Some(path) = &log_file {
            test_file_access(path)?;
        }
        Ok(Self {
            file_path: log_file,
        })
    }

    pub fn log_messages(&self, messages: &[Message]) -> Result<(), Box<dyn Error>> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if messages.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for message in messages {
            let content = match message.role {
                Role::User => format!("You: {}", message.content),
                Role::Assistant => message.content.clone(),
            };
            for line in content.lines() {
                writeln!(writer, "{line}")?;
            }
            // Blank line between messages, as on screen.
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn status_string(&self) -> String {
        match &self.file_path {
            None => "disabled".to_string(),
            Some(path) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }
}

fn test_file_access(path: &Path) -> Result<(), Box<dyn Error>> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("Cannot write to log file {}: {err}", path.display()))?;
    Ok(())
}
