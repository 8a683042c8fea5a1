use std::path::{Path, PathBuf};

pub const SESSION_DIR: &str = "sessions";
pub const EVENT_LOG_FILE: &str = "events.jsonl";

#[must_use]
pub fn session_root(log_dir: &Path) -> PathBuf {
    log_dir.join(SESSION_DIR)
}

/// Session ids become file names verbatim, so only a conservative character
/// set is accepted.
#[must_use]
pub fn is_safe_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[must_use]
pub fn session_file_name(session_id: &str) -> String {
    format!("{session_id}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_safe() {
        assert!(is_safe_session_id("6f1c2a8e-0c3b-4e8e-9a57-1b2f0d7c9e11"));
    }

    #[test]
    fn traversal_ids_are_rejected() {
        assert!(!is_safe_session_id("../etc/passwd"));
        assert!(!is_safe_session_id(""));
        assert!(!is_safe_session_id("a/b"));
    }

    #[test]
    fn file_name_is_id_with_json_extension() {
        assert_eq!(session_file_name("abc"), "abc.json");
        assert_eq!(
            session_root(Path::new("logs")),
            Path::new("logs").join("sessions")
        );
    }
}
