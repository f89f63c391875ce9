use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::backend::{ChatBackend, OllamaBackend};
use crate::core::config::Config;
use crate::core::pipeline::ChatPipeline;
use crate::core::registry::ModelRegistry;
use crate::core::settings::{SettingsError, Temperature};
use crate::core::state::AppState;
use crate::utils::transcript_log::TranscriptLog;
use crate::utils::url::resolve_host;

/// Command-line overrides for a chat session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub host: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<Temperature>,
    pub log_file: Option<PathBuf>,
}

/// A connected session: the backend, the model cache, the pipeline and the
/// initial state with model and temperature already chosen.
pub struct SessionBootstrap {
    pub host: String,
    pub registry: Arc<ModelRegistry>,
    pub pipeline: ChatPipeline,
    pub state: AppState,
    pub transcript: TranscriptLog,
}

impl SessionBootstrap {
    pub async fn connect(options: SessionOptions, config: &Config) -> Result<Self, Box<dyn Error>> {
        let env_host = std::env::var("OLLAMA_HOST").ok();
        let host = resolve_host(
            options.host.as_deref(),
            env_host.as_deref(),
            config.host.as_deref(),
        );
        let backend = Arc::new(OllamaBackend::new(host.clone()));
        Self::with_backend(backend, host, options, config).await
    }

    pub async fn with_backend(
        backend: Arc<dyn ChatBackend>,
        host: String,
        options: SessionOptions,
        config: &Config,
    ) -> Result<Self, Box<dyn Error>> {
        let registry = Arc::new(ModelRegistry::new(backend.clone()));
        let available = registry.list_available().await;
        info!(host = %host, models = available.len(), "Connected session");

        let configured = config.temperature().unwrap_or_else(|err| {
            warn!(error = %err, "Ignoring temperature from config file");
            None
        });
        let temperature = options.temperature.or(configured).unwrap_or_default();
        let mut state = AppState::new().with_temperature(temperature);

        if let Some(model) = options.model.as_deref() {
            if registry.is_connected() && !registry.contains(model) {
                return Err(Box::new(SettingsError::UnknownModel(model.to_string())));
            }
        }
        let preferred = options
            .model
            .as_deref()
            .or(config.default_model.as_deref());
        if let Some(wanted) = preferred {
            if registry.is_connected() && !registry.contains(wanted) {
                warn!(model = wanted, "Configured default model is not installed");
            }
        }
        if let Some(model) = registry.default_selection(preferred) {
            state.select_model(&available, &model)?;
        }

        let transcript = TranscriptLog::new(options.log_file)?;
        let pipeline = ChatPipeline::new(backend, registry.clone());

        Ok(Self {
            host,
            registry,
            pipeline,
            state,
            transcript,
        })
    }
}
