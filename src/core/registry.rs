//! Process-lifetime cache of the models installed on the server.
//!
//! The server is asked at most once. A failed listing is cached as an empty
//! list together with the error text, so the client reports itself
//! disconnected until restart and models pulled later are not discovered.

use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::core::backend::ChatBackend;

pub struct ModelRegistry {
    backend: Arc<dyn ChatBackend>,
    cache: OnceCell<Arc<[String]>>,
    last_error: OnceLock<String>,
}

impl ModelRegistry {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            cache: OnceCell::new(),
            last_error: OnceLock::new(),
        }
    }

    /// The installed model names. Every call after the first returns the
    /// same shared list without contacting the server.
    pub async fn list_available(&self) -> Arc<[String]> {
        self.cache
            .get_or_init(|| async {
                match self.backend.list_models().await {
                    Ok(models) => {
                        info!(count = models.len(), "Cached available models");
                        Arc::<[String]>::from(models)
                    }
                    Err(err) => {
                        warn!(error = %err, "Model listing failed; treating server as disconnected");
                        let _ = self.last_error.set(err.to_string());
                        Arc::<[String]>::from(Vec::new())
                    }
                }
            })
            .await
            .clone()
    }

    /// The cached list, if the server has already been asked.
    pub fn cached(&self) -> Option<Arc<[String]>> {
        self.cache.get().cloned()
    }

    /// Connected means the cached list is non-empty.
    pub fn is_connected(&self) -> bool {
        self.cache.get().is_some_and(|models| !models.is_empty())
    }

    /// Why the listing failed, when it did.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.get().map(String::as_str)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.cache
            .get()
            .is_some_and(|models| models.iter().any(|m| m == model))
    }

    /// The model to select at startup: `preferred` when it is installed,
    /// otherwise the first listed model.
    pub fn default_selection(&self, preferred: Option<&str>) -> Option<String> {
        let models = self.cache.get()?;
        preferred
            .and_then(|wanted| models.iter().find(|m| m.as_str() == wanted))
            .or_else(|| models.first())
            .cloned()
    }
}
