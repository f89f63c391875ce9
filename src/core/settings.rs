use std::error::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    TemperatureOutOfRange(f32),
    InvalidTemperature(String),
    UnknownModel(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::TemperatureOutOfRange(value) => write!(
                f,
                "Temperature {value} is outside the allowed range {:.1}-{:.1}",
                Temperature::MIN,
                Temperature::MAX
            ),
            SettingsError::InvalidTemperature(raw) => {
                write!(f, "'{raw}' is not a valid temperature")
            }
            SettingsError::UnknownModel(model) => {
                write!(f, "Model '{model}' is not available on the Ollama server")
            }
        }
    }
}

impl Error for SettingsError {}

/// Sampling temperature, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f32);

impl Temperature {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 2.0;
    pub const STEP: f32 = 0.1;
    pub const DEFAULT: f32 = 0.7;

    pub fn new(value: f32) -> Result<Self, SettingsError> {
        if value.is_nan() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(SettingsError::TemperatureOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// One step hotter, snapped to the 0.1 grid and clamped to the range.
    pub fn step_up(self) -> Self {
        Self::snapped(self.0 + Self::STEP)
    }

    /// One step cooler, snapped to the 0.1 grid and clamped to the range.
    pub fn step_down(self) -> Self {
        Self::snapped(self.0 - Self::STEP)
    }

    fn snapped(value: f32) -> Self {
        let rounded = (value * 10.0).round() / 10.0;
        Self(rounded.clamp(Self::MIN, Self::MAX))
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl FromStr for Temperature {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f32 = s
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidTemperature(s.to_string()))?;
        Self::new(value)
    }
}
