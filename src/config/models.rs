use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::models::{BackendConnection, BackendKind};

use super::CONFIG;
use super::constants::{
    DB_FILE_PATH, DEFAULT_CONNECTION_ALIAS, DEFAULT_MODEL, DEFAULT_OLLAMA_ENDPOINT, LOG_FILE_PATH,
    THINK_END, THINK_START,
};
use super::defaults::*;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_true")]
    pub show_thoughts: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "log_level")]
    pub level: Option<String>,

    #[serde(default)]
    pub filters: Option<Vec<LogFilter>>,

    #[serde(default)]
    pub file: LogFile,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFilter {
    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFile {
    #[serde(default = "log_file_path")]
    pub path: String,

    #[serde(default)]
    pub append: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub connections: Vec<BackendConnection>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum StorageConfig {
    #[serde(rename = "sqlite")]
    Sqlite(SqliteStorage),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SqliteStorage {
    /// `None` keeps the database in memory
    #[serde(default = "db_file_path")]
    pub path: Option<String>,
}

/// Delimiters that fence the model's reasoning in the streamed output.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    #[serde(default = "think_start")]
    pub think_start: String,

    #[serde(default = "think_end")]
    pub think_end: String,
}

impl Configuration {
    /// Stores the configuration for the lifetime of the process. Only the
    /// first call wins.
    pub fn init(config: Configuration) -> Result<()> {
        CONFIG
            .set(config)
            .map_err(|_| eyre::eyre!("Config already initialized"))?;
        Ok(())
    }

    pub fn instance() -> Option<&'static Configuration> {
        CONFIG.get()
    }

    pub fn verbose_enabled() -> bool {
        Self::instance().is_some_and(|c| c.general.verbose)
    }
}

impl BackendConfig {
    /// Enabled connections, with the global timeout applied to the ones
    /// that don't set their own. Falls back to a local Ollama server when
    /// nothing is configured.
    pub fn effective_connections(&self) -> Vec<BackendConnection> {
        let mut connections = self
            .connections
            .iter()
            .filter(|c| c.enabled())
            .cloned()
            .collect::<Vec<_>>();

        if self.connections.is_empty() {
            connections.push(
                BackendConnection::new(BackendKind::Ollama, DEFAULT_OLLAMA_ENDPOINT)
                    .with_enabled(true)
                    .with_alias(DEFAULT_CONNECTION_ALIAS),
            );
        }

        if let Some(timeout_secs) = self.timeout_secs {
            for connection in connections.iter_mut() {
                if connection.timeout_secs().is_none() {
                    connection.set_timeout_secs(timeout_secs);
                }
            }
        }
        connections
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            show_thoughts: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
            file: LogFile::default(),
            filters: None,
        }
    }
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            path: LOG_FILE_PATH.to_string(),
            append: false,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: None,
            connections: vec![],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite(SqliteStorage::default())
    }
}

impl Default for SqliteStorage {
    fn default() -> Self {
        Self {
            path: Some(DB_FILE_PATH.to_string()),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            think_start: THINK_START.to_string(),
            think_end: THINK_END.to_string(),
        }
    }
}
