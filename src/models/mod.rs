pub mod backend;
pub mod event;
pub mod message;
pub mod storage;
pub mod thread;

pub use backend::*;
pub use event::{ArcEventTx, Event, EventTx};
pub use message::{Message, Role};
pub use storage::FilterThread;
pub use thread::{Thread, title_from_prompt};
