#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

use crate::backend::{ArcBackend, Backend};
use crate::models::{ArcEventTx, BackendPrompt, Model};
use async_trait::async_trait;
use eyre::{Context, Result, bail};
use std::collections::HashMap;

/// Routes each model to the connection that first reported it.
#[derive(Default)]
pub struct Manager {
    connections: HashMap<String, ArcBackend>, /* Alias - Backend */
    models: HashMap<String, String>,          /* Model ID - Alias  */
}

impl Manager {
    pub async fn add_connection(&mut self, connection: ArcBackend) -> Result<()> {
        let alias = connection.name().to_string();

        if self.connections.contains_key(&alias) {
            bail!(format!("connection {} already exists", alias))
        }

        connection
            .list_models()
            .await
            .wrap_err(format!("listing models backend {}", alias))?
            .into_iter()
            .for_each(|m| {
                if self.models.contains_key(m.id()) {
                    log::debug!("Model {} is already served, ignoring {}", m.id(), alias);
                    return;
                }
                self.models.insert(m.id().to_string(), alias.clone());
            });

        self.connections.insert(alias, connection);
        Ok(())
    }

    pub fn get_connection(&self, model: &str) -> Option<&ArcBackend> {
        let alias = self.models.get(model)?;
        self.connections.get(alias)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[async_trait]
impl Backend for Manager {
    fn name(&self) -> &str {
        "Manager"
    }

    async fn list_models(&self) -> Result<Vec<Model>> {
        let mut models = self
            .models
            .iter()
            .map(|(id, alias)| Model::new(id).with_provider(alias))
            .collect::<Vec<_>>();
        models.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(models)
    }

    async fn get_completion(&self, prompt: BackendPrompt, event_tx: ArcEventTx) -> Result<()> {
        let connection = match self.get_connection(prompt.model()) {
            Some(connection) => connection,
            None => bail!("model {} is not available", prompt.model()),
        };
        connection
            .get_completion(prompt, event_tx)
            .await
            .wrap_err(format!("get completion from backend {}", connection.name()))?;
        Ok(())
    }
}
