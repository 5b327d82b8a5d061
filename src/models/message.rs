use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(eyre::eyre!("unknown message role: {}", other)),
        }
    }
}

/// A single turn of a thread. `thought` is only filled for assistant turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: String,
    thread_id: String,
    role: Role,
    content: String,
    thought: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(thread_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            role,
            content: content.into(),
            thought: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn new_user(thread_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(thread_id, Role::User, content)
    }

    pub fn new_assistant(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        thought: impl Into<String>,
    ) -> Self {
        Self::new(thread_id, Role::Assistant, content).with_thought(thought)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = thought.into();
        self
    }

    pub fn with_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_at = timestamp;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn thought(&self) -> &str {
        &self.thought
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
