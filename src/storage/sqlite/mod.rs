#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

pub(crate) mod migration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use tokio_rusqlite::{Connection, OpenFlags, OptionalExtension, ToSql, named_params, params};

use crate::models::{FilterThread, Message, Role, Thread};
use crate::storage::{Storage, StorageError};

pub struct Sqlite {
    conn: Connection,
}

impl Sqlite {
    /// Opens (or creates) the database at `path` and brings the schema up
    /// to date. `None` opens a private in-memory database.
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
            .await
            .wrap_err(format!("opening database path: {}", path))?,
            None => Connection::open_in_memory()
                .await
                .wrap_err("opening in-memory database")?,
        };

        let ret = Self { conn };
        ret.run_migration().await.wrap_err("running migration")?;
        Ok(ret)
    }

    async fn run_migration(&self) -> Result<()> {
        self.conn
            .call(|conn| Ok(conn.execute_batch(migration::MIGRATION)?))
            .await
            .wrap_err("executing migration")?;
        Ok(())
    }
}

#[async_trait]
impl Storage for Sqlite {
    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let thread = Thread::new(title).with_created_at(now_millis());

        let row = thread.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO threads (id, title, created_at, updated_at) VALUES (:id, :title, :created_at, :updated_at)",
                    named_params! {
                        ":id": row.id(),
                        ":title": row.title(),
                        ":created_at": row.created_at().timestamp_millis(),
                        ":updated_at": row.updated_at().timestamp_millis(),
                    },
                )?;
                Ok(())
            })
            .await
            .wrap_err("inserting thread")?;

        log::debug!("Created thread {} ({})", thread.id(), thread.title());
        Ok(thread)
    }

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        let mut threads = self
            .get_threads(FilterThread::default().with_id(id))
            .await
            .wrap_err("getting thread")?;
        Ok(threads.pop())
    }

    async fn get_threads(&self, filter: FilterThread) -> Result<Vec<Thread>> {
        let threads = self
            .conn
            .call(move |conn| {
                let (query, params) = filter_to_query(&filter);
                let mut stmt = conn.prepare(&query)?;
                let params: Vec<(&str, &dyn ToSql)> =
                    params.iter().map(|(n, v)| (*n, v.as_ref())).collect();
                let mut rows = stmt.query(params.as_slice())?;

                let mut threads = vec![];
                while let Some(row) = rows.next()? {
                    let id: String = row.get(0)?;
                    let title: String = row.get(1)?;
                    let created_at = from_millis(row.get(2)?)?;
                    let updated_at = from_millis(row.get(3)?)?;

                    threads.push(
                        Thread::default()
                            .with_id(id)
                            .with_title(title)
                            .with_created_at(created_at)
                            .with_updated_at(updated_at),
                    );
                }
                Ok(threads)
            })
            .await
            .wrap_err("querying threads")?;
        Ok(threads)
    }

    async fn rename_thread(&self, id: &str, title: &str) -> Result<()> {
        let thread_id = id.to_string();
        let title = title.to_string();
        let affected = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "UPDATE threads SET title = ? WHERE id = ?",
                    params![title, thread_id],
                )?)
            })
            .await
            .wrap_err("renaming thread")?;

        if affected == 0 {
            return Err(StorageError::ThreadNotFound(id.to_string()).into());
        }
        Ok(())
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        let thread_id = id.to_string();
        let affected = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                // Explicit so it does not depend on the foreign_keys pragma
                tx.execute(
                    "DELETE FROM messages WHERE thread_id = ?",
                    params![thread_id],
                )?;
                let affected = tx.execute("DELETE FROM threads WHERE id = ?", params![thread_id])?;
                tx.commit()?;
                Ok(affected)
            })
            .await
            .wrap_err("deleting thread")?;

        if affected == 0 {
            return Err(StorageError::ThreadNotFound(id.to_string()).into());
        }
        log::debug!("Deleted thread {}", id);
        Ok(())
    }

    async fn append_message(&self, message: Message) -> Result<Message> {
        let now = now_millis().timestamp_millis();

        let row = message.clone();
        let stamped = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let previous: Option<i64> = tx
                    .query_row(
                        "SELECT updated_at FROM threads WHERE id = ?",
                        params![row.thread_id()],
                        |r| r.get(0),
                    )
                    .optional()?;
                let Some(previous) = previous else {
                    // Dropping the transaction rolls it back
                    return Ok(None);
                };

                // Never move the thread back in time
                let created_at = now.max(previous);
                tx.execute(
                    "UPDATE threads SET updated_at = :updated_at WHERE id = :id",
                    named_params! {
                        ":updated_at": created_at,
                        ":id": row.thread_id(),
                    },
                )?;
                tx.execute(
                    r#"INSERT INTO messages (id, thread_id, role, content, thought, created_at)
                VALUES (:id, :thread_id, :role, :content, :thought, :created_at)"#,
                    named_params! {
                        ":id": row.id(),
                        ":thread_id": row.thread_id(),
                        ":role": row.role().as_str(),
                        ":content": row.content(),
                        ":thought": row.thought(),
                        ":created_at": created_at,
                    },
                )?;
                tx.commit()?;
                Ok(Some(from_millis(created_at)?))
            })
            .await
            .wrap_err("appending message")?;

        let Some(created_at) = stamped else {
            return Err(StorageError::ThreadNotFound(message.thread_id().to_string()).into());
        };
        let message = message.with_created_at(created_at);

        log::debug!(
            "Appended {} message {} to thread {}",
            message.role(),
            message.id(),
            message.thread_id()
        );
        Ok(message)
    }

    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let thread_id = thread_id.to_string();
        let messages = self.conn.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thread_id, role, content, thought, created_at FROM messages WHERE thread_id = ? ORDER BY created_at ASC, rowid ASC",
            )?;

            let mut rows = stmt.query(params![thread_id])?;
            let mut messages = vec![];
            while let Some(row) = rows.next()? {
                let id: String = row.get(0)?;
                let thread_id: String = row.get(1)?;
                let role: String = row.get(2)?;
                let content: String = row.get(3)?;
                let thought: String = row.get(4)?;
                let created_at = from_millis(row.get(5)?)?;

                let role = role
                    .parse::<Role>()
                    .map_err(|e| tokio_rusqlite::Error::Other(e.into()))?;

                messages.push(
                    Message::new(thread_id, role, content)
                        .with_id(id)
                        .with_thought(thought)
                        .with_created_at(created_at),
                );
            }
            Ok(messages)
        })
        .await
        .wrap_err("querying messages")?;
        Ok(messages)
    }
}

fn filter_to_query(filter: &FilterThread) -> (String, Vec<(&str, Box<dyn ToSql>)>) {
    let mut query =
        String::from("SELECT id, title, created_at, updated_at FROM threads WHERE 1=1");
    let mut params: Vec<(&str, Box<dyn ToSql>)> = vec![];

    if let Some(id) = filter.id() {
        query.push_str(" AND id = :id");
        params.push((":id", Box::new(id.to_string())));
    }

    if let Some(title) = filter.title() {
        query.push_str(" AND title LIKE :title");
        params.push((":title", Box::new(format!("%{}%", title))));
    }

    if let Some(message_contains) = filter.message_contains() {
        query.push_str(" AND EXISTS (SELECT 1 FROM messages WHERE thread_id = threads.id AND content LIKE :message_contains)");
        params.push((
            ":message_contains",
            Box::new(format!("%{}%", message_contains)),
        ));
    }

    if let Some(from) = filter.updated_at_from() {
        query.push_str(" AND updated_at >= :updated_at_from");
        params.push((":updated_at_from", Box::new(from.timestamp_millis())));
    }

    if let Some(to) = filter.updated_at_to() {
        query.push_str(" AND updated_at <= :updated_at_to");
        params.push((":updated_at_to", Box::new(to.timestamp_millis())));
    }

    query.push_str(" ORDER BY updated_at DESC, created_at DESC");

    if let Some(limit) = filter.limit() {
        query.push_str(" LIMIT :limit");
        params.push((":limit", Box::new(limit as i64)));
    }

    (query, params)
}

/// Current time truncated to what the database keeps.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn from_millis(millis: i64) -> std::result::Result<DateTime<Utc>, tokio_rusqlite::Error> {
    DateTime::from_timestamp_millis(millis).ok_or(tokio_rusqlite::Error::Other(
        eyre::eyre!("invalid timestamp {}", millis).into(),
    ))
}
