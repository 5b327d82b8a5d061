use std::sync::Arc;

use tokio::sync::mpsc;

use super::*;
use crate::models::{BackendResponse, Event};

struct FakeBackend {
    alias: String,
    models: Vec<String>,
    fail_listing: bool,
}

impl FakeBackend {
    fn new(alias: &str, models: &[&str]) -> Self {
        Self {
            alias: alias.to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
            fail_listing: false,
        }
    }

    fn failing(alias: &str) -> Self {
        Self {
            fail_listing: true,
            ..Self::new(alias, &[])
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.alias
    }

    async fn list_models(&self) -> Result<Vec<Model>> {
        if self.fail_listing {
            bail!("connection refused");
        }
        Ok(self
            .models
            .iter()
            .map(|m| Model::new(m).with_provider(&self.alias))
            .collect())
    }

    async fn get_completion(&self, prompt: BackendPrompt, event_tx: ArcEventTx) -> Result<()> {
        event_tx
            .send(Event::BackendPromptResponse(BackendResponse {
                model: prompt.model().to_string(),
                id: "1".to_string(),
                text: self.alias.clone(),
                done: true,
                usage: None,
            }))
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_add_connection() {
    let mut manager = Manager::default();
    assert!(manager.is_empty());

    manager
        .add_connection(Arc::new(FakeBackend::new("local", &["a", "b"])))
        .await
        .unwrap();
    manager
        .add_connection(Arc::new(FakeBackend::new("remote", &["b", "c"])))
        .await
        .unwrap();
    assert!(!manager.is_empty());

    let err = manager
        .add_connection(Arc::new(FakeBackend::new("local", &["d"])))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "connection local already exists");

    let err = manager
        .add_connection(Arc::new(FakeBackend::failing("broken")))
        .await;
    assert!(err.is_err());

    let models = manager.list_models().await.unwrap();
    let models = models
        .iter()
        .map(|m| (m.id(), m.provider()))
        .collect::<Vec<_>>();
    assert_eq!(
        models,
        vec![("a", "local"), ("b", "local"), ("c", "remote")]
    );

    assert_eq!(manager.get_connection("c").unwrap().name(), "remote");
    assert!(manager.get_connection("d").is_none());
}

#[tokio::test]
async fn test_get_completion_routes_by_model() {
    let mut manager = Manager::default();
    manager
        .add_connection(Arc::new(FakeBackend::new("local", &["a"])))
        .await
        .unwrap();
    manager
        .add_connection(Arc::new(FakeBackend::new("remote", &["c"])))
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let tx: ArcEventTx = Arc::new(tx);

    manager
        .get_completion(BackendPrompt::new("hi").with_model("c"), tx.clone())
        .await
        .unwrap();
    match rx.recv().await {
        Some(Event::BackendPromptResponse(res)) => {
            assert_eq!(res.text, "remote");
            assert_eq!(res.model, "c");
        }
        event => panic!("unexpected event: {:?}", event),
    }

    let err = manager
        .get_completion(BackendPrompt::new("hi").with_model("missing"), tx)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "model missing is not available");
}
