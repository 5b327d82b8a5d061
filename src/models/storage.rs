use chrono::{DateTime, Utc};

/// Criteria for listing threads. An empty filter matches every thread.
#[derive(Debug, Clone, Default)]
pub struct FilterThread {
    id: Option<String>,
    title: Option<String>,
    message_contains: Option<String>,
    updated_at_from: Option<DateTime<Utc>>,
    updated_at_to: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl FilterThread {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_message_contains(mut self, message_contains: impl Into<String>) -> Self {
        self.message_contains = Some(message_contains.into());
        self
    }

    pub fn with_updated_at_from(mut self, from: DateTime<Utc>) -> Self {
        self.updated_at_from = Some(from);
        self
    }

    pub fn with_updated_at_to(mut self, to: DateTime<Utc>) -> Self {
        self.updated_at_to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn message_contains(&self) -> Option<&str> {
        self.message_contains.as_deref()
    }

    pub fn updated_at_from(&self) -> Option<DateTime<Utc>> {
        self.updated_at_from
    }

    pub fn updated_at_to(&self) -> Option<DateTime<Utc>> {
        self.updated_at_to
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
