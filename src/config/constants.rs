pub const DEFAULT_MODEL: &str = "deepseek-r1:1.5b";

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

pub const DEFAULT_CONNECTION_ALIAS: &str = "local";

pub const LOG_FILE_PATH: &str = "${HOME}/.local/state/thinkchat/thinkchat.log";

pub const DB_FILE_PATH: &str = "${HOME}/.local/share/thinkchat/chat.db";

pub const THINK_START: &str = "<think>";

pub const THINK_END: &str = "</think>";

pub const NEW_THREAD_TITLE: &str = "New Chat";

/// Titles derived from the first prompt are cut to this many chars
pub const MAX_TITLE_CHARS: usize = 48;
