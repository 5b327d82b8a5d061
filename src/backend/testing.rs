//! Test double that replays a fixed list of fragments.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use eyre::Result;

use crate::backend::Backend;
use crate::models::{ArcEventTx, BackendPrompt, BackendResponse, Event, Model};

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    pub(crate) fragments: Vec<String>,
    pub(crate) fail_with: Option<String>,
    pub(crate) prompts: Mutex<Vec<BackendPrompt>>,
    pub(crate) calls: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn failing(fragments: &[&str], message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(fragments)
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_models(&self) -> Result<Vec<Model>> {
        Ok(vec![Model::new("deepseek-r1:1.5b")])
    }

    async fn get_completion(&self, prompt: BackendPrompt, event_tx: ArcEventTx) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = prompt.model().to_string();
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt);
        }

        for text in &self.fragments {
            event_tx
                .send(Event::BackendPromptResponse(BackendResponse {
                    model: model.clone(),
                    id: "resp".to_string(),
                    text: text.clone(),
                    done: false,
                    usage: None,
                }))
                .await?;
        }

        if let Some(message) = &self.fail_with {
            eyre::bail!(message.clone());
        }

        event_tx
            .send(Event::BackendPromptResponse(BackendResponse {
                model,
                id: "resp".to_string(),
                text: String::new(),
                done: true,
                usage: None,
            }))
            .await?;
        Ok(())
    }
}
