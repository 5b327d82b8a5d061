#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use std::sync::Arc;

use eyre::{Context, Result};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::backend::ArcBackend;
use crate::config::{StreamConfig, constants::DEFAULT_MODEL};
use crate::models::{ArcEventTx, BackendPrompt, Event, Message, Thread, title_from_prompt};
use crate::storage::{ArcStorage, StorageError};
use crate::stream::{Fragment, StreamAccumulator};

/// Drives one prompt at a time: persist the user turn, stream the
/// completion through the accumulator, persist the assistant turn.
#[derive(Clone)]
pub struct ChatService {
    backend: ArcBackend,
    storage: ArcStorage,
    model: String,
    stream: StreamConfig,
}

impl ChatService {
    pub fn new(backend: ArcBackend, storage: ArcStorage) -> Self {
        Self {
            backend,
            storage,
            model: DEFAULT_MODEL.to_string(),
            stream: StreamConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn storage(&self) -> &ArcStorage {
        &self.storage
    }

    /// Returns the thread `thread_id` names, or creates one titled `title`
    /// (falling back to the prompt's first line).
    pub async fn ensure_thread(
        &self,
        thread_id: Option<&str>,
        title: Option<&str>,
        prompt: &str,
    ) -> Result<Thread> {
        if let Some(id) = thread_id {
            return self
                .storage
                .get_thread(id)
                .await
                .wrap_err("getting thread")?
                .ok_or_else(|| StorageError::ThreadNotFound(id.to_string()).into());
        }

        let title = match title.map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => title_from_prompt(prompt),
        };
        self.storage
            .create_thread(&title)
            .await
            .wrap_err("creating thread")
    }

    /// Sends `prompt` to the backend and stores both turns in `thread_id`.
    /// Whitespace-only prompts are ignored and yield `None`.
    ///
    /// `event_tx` receives `MessageSaved` for the user turn, then the
    /// thought and response deltas as they stream in, then `MessageSaved`
    /// for the assistant turn.
    pub async fn submit(
        &self,
        thread_id: &str,
        prompt: &str,
        event_tx: ArcEventTx,
    ) -> Result<Option<Message>> {
        if prompt.trim().is_empty() {
            return Ok(None);
        }

        let user_message = self
            .storage
            .append_message(Message::new_user(thread_id, prompt))
            .await
            .wrap_err("saving user message")?;
        event_tx.send(Event::MessageSaved(user_message)).await?;

        let (worker_tx, mut worker_rx) = mpsc::unbounded_channel::<Event>();
        let worker = self.spawn_completion(
            BackendPrompt::new(prompt.trim()).with_model(&self.model),
            Arc::new(worker_tx),
        );

        let mut accumulator = StreamAccumulator::new(&self.stream);
        while let Some(event) = worker_rx.recv().await {
            let res = match event {
                Event::BackendPromptResponse(res) => res,
                event => {
                    log::warn!("Unexpected event from backend worker: {:?}", event);
                    continue;
                }
            };

            if let Some(usage) = res.usage.as_ref() {
                log::debug!("Completion {} usage: {}", res.id, usage);
            }

            if res.text.is_empty() {
                continue;
            }

            let event = match accumulator.push(&res.text) {
                Fragment::Thought(text) => Event::ThoughtDelta(text),
                Fragment::Response(text) => Event::ResponseDelta(text),
                Fragment::ThinkingDone => Event::ThinkingDone,
                Fragment::Skipped => continue,
            };
            event_tx.send(event).await?;
        }

        worker
            .await
            .wrap_err("joining completion worker")?
            .wrap_err("getting completion")?;

        let out = accumulator.finish();
        if out.content.is_empty() {
            log::debug!("No end delimiter in completion, the whole output is thought");
        }

        let assistant_message = self
            .storage
            .append_message(Message::new_assistant(thread_id, out.content, out.thought))
            .await
            .wrap_err("saving assistant message")?;
        event_tx
            .send(Event::MessageSaved(assistant_message.clone()))
            .await?;

        Ok(Some(assistant_message))
    }

    fn spawn_completion(
        &self,
        prompt: BackendPrompt,
        event_tx: ArcEventTx,
    ) -> JoinHandle<Result<()>> {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            log::debug!("Requesting completion from model {}", prompt.model());
            backend.get_completion(prompt, event_tx).await
        })
    }
}
