pub mod manager;
pub mod ollama;
#[cfg(test)]
pub(crate) mod testing;

pub use manager::Manager;
pub use ollama::{Ollama, OllamaError};

use crate::{
    config::{BackendConfig, verbose},
    models::{ArcEventTx, BackendKind, BackendPrompt, Model},
};
use async_trait::async_trait;
use eyre::{Context, Result};
use std::sync::Arc;

#[async_trait]
pub trait Backend {
    fn name(&self) -> &str;
    /// Models this backend can serve, sorted by id.
    async fn list_models(&self) -> Result<Vec<Model>>;
    /// Streams the completion for `prompt` into `event_tx` as
    /// `Event::BackendPromptResponse`. Returns once the stream is exhausted;
    /// the last event sent has `done` set.
    async fn get_completion(&self, prompt: BackendPrompt, event_tx: ArcEventTx) -> Result<()>;
}

pub type ArcBackend = Arc<dyn Backend + Send + Sync>;

pub async fn new_manager(config: &BackendConfig) -> Result<ArcBackend> {
    let connections = config.effective_connections();
    if connections.is_empty() {
        eyre::bail!("No backend connections configured");
    }

    let mut manager = manager::Manager::default();
    for connection in connections {
        let backend: ArcBackend = match connection.kind() {
            BackendKind::Ollama => Ollama::from(&connection).into(),
        };

        let name = backend.name().to_string();
        if let Err(err) = manager
            .add_connection(backend)
            .await
            .wrap_err(format!("adding connection {}", name))
        {
            log::warn!("Failed to add backend connection: {:?}", err);
            verbose!("  [-] Skipped backend {}: {}", name, err);
            continue;
        }
        verbose!("  [+] Added backend: {}", name);
        log::debug!("Added backend connection: {}", name);
    }

    if manager.is_empty() {
        eyre::bail!("No backend connections available");
    }

    Ok(Arc::new(manager))
}
