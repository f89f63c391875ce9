use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::config::io::ConfigError;
use crate::core::settings::{SettingsError, Temperature};
use crate::utils::url::normalize_host;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Ollama server address; bare `host:port` is accepted.
    pub host: Option<String>,
    /// Model selected at startup when it is installed.
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
}

/// Keys accepted by `set` and `unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Host,
    DefaultModel,
    Temperature,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [
        ConfigKey::Host,
        ConfigKey::DefaultModel,
        ConfigKey::Temperature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Host => "host",
            ConfigKey::DefaultModel => "default-model",
            ConfigKey::Temperature => "temperature",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s || key.as_str().replace('-', "_") == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl Config {
    /// Temperature from the file, validated. A hand-edited out-of-range
    /// value is reported rather than dropped.
    pub fn temperature(&self) -> Result<Option<Temperature>, SettingsError> {
        self.temperature.map(Temperature::new).transpose()
    }

    /// Sets `key` from command-line text and returns a confirmation line.
    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<String, ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::InvalidValue {
                key,
                message: "a value is required".to_string(),
            });
        }
        match key {
            ConfigKey::Host => {
                let host = normalize_host(value);
                self.host = Some(host.clone());
                Ok(format!("✅ Set host to: {host}"))
            }
            ConfigKey::DefaultModel => {
                self.default_model = Some(value.to_string());
                Ok(format!("✅ Set default-model to: {value}"))
            }
            ConfigKey::Temperature => {
                let temperature: Temperature =
                    value.parse().map_err(|err| ConfigError::InvalidValue {
                        key,
                        message: format!("{err}"),
                    })?;
                self.temperature = Some(temperature.value());
                Ok(format!("✅ Set temperature to: {temperature}"))
            }
        }
    }

    pub fn unset_value(&mut self, key: ConfigKey) -> String {
        match key {
            ConfigKey::Host => self.host = None,
            ConfigKey::DefaultModel => self.default_model = None,
            ConfigKey::Temperature => self.temperature = None,
        }
        format!("✅ Unset {key}")
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
