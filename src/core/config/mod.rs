//! Persisted user configuration (`config.toml` in the platform config dir).

pub mod data;
pub mod io;
pub mod printing;

pub use data::{path_display, Config, ConfigKey};
pub use io::ConfigError;
