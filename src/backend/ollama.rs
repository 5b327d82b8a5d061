#[cfg(test)]
#[path = "ollama_test.rs"]
mod tests;

use crate::backend::{ArcBackend, Backend};
use crate::config::{constants::DEFAULT_OLLAMA_ENDPOINT, user_agent};
use crate::models::{
    ArcEventTx, BackendConnection, BackendPrompt, BackendResponse, BackendUsage, Event, Model,
};
use async_trait::async_trait;
use eyre::{Context, Result, bail};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::{fmt::Display, time};
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

pub struct Ollama {
    alias: String,
    endpoint: String,
    timeout: Option<time::Duration>,

    want_models: Vec<String>,
}

#[async_trait]
impl Backend for Ollama {
    fn name(&self) -> &str {
        &self.alias
    }

    async fn list_models(&self) -> Result<Vec<Model>> {
        let mut req = reqwest::Client::new()
            .get(format!("{}/api/tags", self.endpoint))
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let res = req.send().await.wrap_err("listing models")?;

        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }

        let res = res
            .json::<TagsResponse>()
            .await
            .wrap_err("parsing model list response")?;

        let all = self.want_models.is_empty();

        let mut models = res
            .models
            .into_iter()
            .filter(|m| all || self.want_models.contains(&m.name))
            .map(|m| Model::new(m.name).with_provider(&self.alias))
            .collect::<Vec<_>>();

        models.sort_by(|a, b| a.id().cmp(b.id()));

        Ok(models)
    }

    async fn get_completion(&self, prompt: BackendPrompt, event_tx: ArcEventTx) -> Result<()> {
        if prompt.model().is_empty() {
            bail!("no model is set");
        }

        let chat_req = ChatRequest {
            model: prompt.model().to_string(),
            messages: vec![MessageRequest {
                role: "user".to_string(),
                content: prompt.text().trim().to_string(),
            }],
            stream: true,
        };

        let mut req = reqwest::Client::new()
            .post(format!("{}/api/chat", self.endpoint))
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        log::trace!("Sending chat request: {:?}", chat_req);

        let res = req
            .json(&chat_req)
            .send()
            .await
            .wrap_err("sending chat request")?;

        if !res.status().is_success() {
            let err = error_from_response(res).await;
            log::error!("Error response: {}", err);
            return Err(err.into());
        }

        let stream = res
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()));

        let mut line_readers = StreamReader::new(stream).lines();

        let message_id = uuid::Uuid::new_v4().to_string();
        let mut finished = false;

        while let Some(line) = line_readers
            .next_line()
            .await
            .wrap_err("reading chat stream")?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            log::trace!("streaming response: {}", line);

            let data = serde_json::from_str::<ChatResponse>(line)
                .wrap_err(format!("parsing chat response line: {}", line))?;

            let usage = if data.done { data.usage() } else { None };

            if let Some(message) = data.error {
                return Err(OllamaError {
                    http_code: 200,
                    message,
                }
                .into());
            }

            let text = data.message.map(|m| m.content).unwrap_or_default();

            if !data.done && text.is_empty() {
                continue;
            }

            let msg = BackendResponse {
                id: message_id.clone(),
                model: if data.model.is_empty() {
                    prompt.model().to_string()
                } else {
                    data.model
                },
                text,
                done: data.done,
                usage,
            };
            event_tx.send(Event::BackendPromptResponse(msg)).await?;

            if data.done {
                finished = true;
                break;
            }
        }

        // Some servers close the stream without a final object
        if !finished {
            let msg = BackendResponse {
                id: message_id,
                model: prompt.model().to_string(),
                text: String::new(),
                done: true,
                usage: None,
            };
            event_tx.send(Event::BackendPromptResponse(msg)).await?;
        }

        Ok(())
    }
}

impl From<Ollama> for ArcBackend {
    fn from(value: Ollama) -> Self {
        Arc::new(value)
    }
}

impl From<&BackendConnection> for Ollama {
    fn from(value: &BackendConnection) -> Self {
        let mut ollama = Ollama::default();

        if !value.endpoint().is_empty() {
            ollama = ollama.with_endpoint(value.endpoint());
        }

        if let Some(timeout) = value.timeout() {
            ollama.timeout = Some(timeout);
        }

        if let Some(alias) = value.alias() {
            ollama = ollama.with_alias(alias);
        }

        ollama.with_want_models(value.models().to_vec())
    }
}

impl Ollama {
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn with_want_models(mut self, models: Vec<String>) -> Self {
        self.want_models = models;
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }

    pub fn want_models(&self) -> &[String] {
        &self.want_models
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self {
            alias: "Ollama".to_string(),
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            timeout: None,
            want_models: vec![],
        }
    }
}

async fn error_from_response(res: reqwest::Response) -> OllamaError {
    let http_code = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => err.error,
        Err(_) if body.trim().is_empty() => format!("unexpected status {}", http_code),
        Err(_) => body.trim().to_string(),
    };
    OllamaError { http_code, message }
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct TagResponse {
    name: String,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct TagsResponse {
    models: Vec<TagResponse>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
struct MessageRequest {
    role: String,
    content: String,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<MessageRequest>,
    stream: bool,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<MessageRequest>,
    #[serde(default)]
    done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_eval_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eval_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ChatResponse {
    fn usage(&self) -> Option<BackendUsage> {
        if self.prompt_eval_count.is_none() && self.eval_count.is_none() {
            return None;
        }
        let prompt_tokens = self.prompt_eval_count.unwrap_or_default();
        let completion_tokens = self.eval_count.unwrap_or_default();
        Some(BackendUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        })
    }
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Default, Error, Debug, PartialEq, Eq)]
pub struct OllamaError {
    pub http_code: u16,
    pub message: String,
}

impl Display for OllamaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ollama error ({}): {}", self.http_code, self.message)
    }
}
