use crate::core::settings::{SettingsError, Temperature};
use crate::core::store::ConversationStore;

/// Everything a chat session owns between turns: the conversations, the
/// selected model and the sampling temperature.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub store: ConversationStore,
    selected_model: Option<String>,
    temperature: Temperature,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Selects `model`, which must be one of `available`.
    pub fn select_model(&mut self, available: &[String], model: &str) -> Result<(), SettingsError> {
        if !available.iter().any(|m| m == model) {
            return Err(SettingsError::UnknownModel(model.to_string()));
        }
        self.selected_model = Some(model.to_string());
        Ok(())
    }

    pub fn clear_model(&mut self) {
        self.selected_model = None;
    }

    /// Advances the selection to the next model in `available`, wrapping
    /// around. Returns the newly selected model.
    pub fn cycle_model(&mut self, available: &[String]) -> Option<&str> {
        if available.is_empty() {
            return None;
        }
        let next = self
            .selected_model
            .as_ref()
            .and_then(|current| available.iter().position(|m| m == current))
            .map_or(0, |pos| (pos + 1) % available.len());
        self.selected_model = Some(available[next].clone());
        self.selected_model.as_deref()
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: Temperature) {
        self.temperature = temperature;
    }
}
