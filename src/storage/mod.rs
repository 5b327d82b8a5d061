pub mod sqlite;

use std::sync::Arc;

use crate::{
    config::{StorageConfig, ensure_parent_dir, resolve_path},
    models::{FilterThread, Message, Thread},
};
use async_trait::async_trait;
use eyre::{Context, Result};
use sqlite::Sqlite;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Storage {
    /// Creates an empty thread; both timestamps are set to now.
    async fn create_thread(&self, title: &str) -> Result<Thread>;
    async fn get_thread(&self, id: &str) -> Result<Option<Thread>>;
    /// Threads matching the filter, most recently updated first.
    async fn get_threads(&self, filter: FilterThread) -> Result<Vec<Thread>>;
    async fn rename_thread(&self, id: &str, title: &str) -> Result<()>;
    async fn delete_thread(&self, id: &str) -> Result<()>;
    /// Inserts the message and moves the parent thread's `updated_at` to
    /// the message's `created_at`, atomically. The store stamps
    /// `created_at` with the current time, or the thread's `updated_at`
    /// when that is later, so a thread never moves back in time. The
    /// stored message is returned.
    async fn append_message(&self, message: Message) -> Result<Message>;
    /// Messages of a thread, oldest first.
    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>>;
}

pub type ArcStorage = Arc<dyn Storage + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("thread {0} not found")]
    ThreadNotFound(String),
}

pub async fn new_storage(config: &StorageConfig) -> Result<ArcStorage> {
    let storage = match config {
        StorageConfig::Sqlite(sqlite_config) => {
            let path = match sqlite_config.path.as_deref() {
                Some(path) => {
                    let path =
                        resolve_path(path).wrap_err(format!("resolving database path {}", path))?;
                    ensure_parent_dir(&path)?;
                    Some(path)
                }
                None => None,
            };
            log::debug!("Opening sqlite storage at {:?}", path);
            Arc::new(Sqlite::new(path.as_deref()).await?)
        }
    };
    Ok(storage)
}
