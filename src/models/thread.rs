#[cfg(test)]
#[path = "thread_test.rs"]
mod tests;

use chrono::{DateTime, Utc};

use crate::config::constants::{MAX_TITLE_CHARS, NEW_THREAD_TITLE};

/// A conversation container. `updated_at` follows the newest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(title: impl Into<String>) -> Self {
        Self::default().with_title(title)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets both timestamps, as a freshly created thread has them equal.
    pub fn with_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_at = timestamp;
        self.updated_at = timestamp;
        self
    }

    pub fn with_updated_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.updated_at = timestamp;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Default for Thread {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: NEW_THREAD_TITLE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builds a thread title out of the first line of a prompt.
pub fn title_from_prompt(prompt: &str) -> String {
    let line = prompt.trim().lines().next().unwrap_or_default().trim();
    if line.is_empty() {
        return NEW_THREAD_TITLE.to_string();
    }

    if line.chars().count() <= MAX_TITLE_CHARS {
        return line.to_string();
    }

    let mut title = line
        .chars()
        .take(MAX_TITLE_CHARS - 1)
        .collect::<String>()
        .trim_end()
        .to_string();
    title.push('…');
    title
}
