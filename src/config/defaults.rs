use super::constants::*;

pub(crate) fn log_level() -> Option<String> {
    Some("info".to_string())
}

pub(crate) fn log_file_path() -> String {
    LOG_FILE_PATH.to_string()
}

pub(crate) fn db_file_path() -> Option<String> {
    Some(DB_FILE_PATH.to_string())
}

pub(crate) fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

pub(crate) fn think_start() -> String {
    THINK_START.to_string()
}

pub(crate) fn think_end() -> String {
    THINK_END.to_string()
}

pub(crate) fn default_true() -> bool {
    true
}
