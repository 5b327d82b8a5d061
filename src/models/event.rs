use std::sync::Arc;

use tokio::sync::mpsc;

use super::{BackendResponse, Message};

#[derive(Debug)]
pub enum Event {
    /// Raw fragment coming out of a backend
    BackendPromptResponse(BackendResponse),

    /// Text appended to the thought buffer
    ThoughtDelta(String),
    /// Text appended to the response buffer
    ResponseDelta(String),
    /// The end delimiter went by, everything after is the response
    ThinkingDone,

    /// A message was written to storage
    MessageSaved(Message),
}

#[async_trait::async_trait]
pub trait EventTx {
    async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>>;
}

#[async_trait::async_trait]
impl EventTx for mpsc::UnboundedSender<Event> {
    async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.send(event)
    }
}

pub type ArcEventTx = Arc<dyn EventTx + Send + Sync>;
