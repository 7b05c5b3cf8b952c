//! Conversation session management
//!
//! Claude Code writes one append-only JSONL log per session under a
//! project-keyed directory tree:
//!
//! ```text
//! ~/.claude/projects/
//!   -Users-me-app/
//!     b4749c81-937a-4bd4-b62c-9d78905f0975.jsonl
//!   -Users-me-other/
//!     ...
//! ```
//!
//! The filesystem is the only source of truth. Nothing is cached between
//! calls: every listing, lookup and append re-reads the files it needs.
//!
//! Read paths degrade instead of failing (a bad file or a bad line is
//! skipped), write paths report every error.

mod append;
mod context;
mod resolve;
mod scan;

pub use append::{append_durable, build_user_record};
pub use context::load_context;
pub use resolve::{resolve_session_file, validate_session_id};
pub use scan::{list_sessions, NO_MESSAGES};

use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::types::{ConversationContext, RecordDefaults, SendReceipt, SessionSummary};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Entry point for session operations over one projects directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    projects_dir: PathBuf,
    log_suffix: String,
    defaults: RecordDefaults,
}

impl SessionStore {
    /// Create a store over `projects_dir` using `.jsonl` logs.
    pub fn new(projects_dir: PathBuf, defaults: RecordDefaults) -> Self {
        Self {
            projects_dir,
            log_suffix: "jsonl".to_string(),
            defaults,
        }
    }

    /// Create a store from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let defaults = RecordDefaults {
            cwd: config.default_cwd().to_string_lossy().into_owned(),
            version: config.record.default_version.clone(),
        };
        Self::new(config.projects_dir(), defaults).with_log_suffix(&config.claude.log_suffix)
    }

    /// Use a different log file extension (without the dot).
    pub fn with_log_suffix(mut self, suffix: &str) -> Self {
        self.log_suffix = suffix.trim_start_matches('.').to_string();
        self
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    pub fn log_suffix(&self) -> &str {
        &self.log_suffix
    }

    pub fn defaults(&self) -> &RecordDefaults {
        &self.defaults
    }

    /// All sessions, most recently modified first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        list_sessions(&self.projects_dir, &self.log_suffix)
    }

    /// Backing log file for a session.
    pub fn resolve(&self, session_id: &str, project_path: Option<&str>) -> Result<PathBuf> {
        resolve_session_file(&self.projects_dir, &self.log_suffix, session_id, project_path)
    }

    /// Context recovered from the tail of a log file.
    pub fn load_context(&self, path: &Path) -> ConversationContext {
        load_context(path, &self.defaults)
    }

    /// Append a user message to a session's log.
    ///
    /// Resolves the log, recovers its context, builds a record chained to the
    /// last valid one and appends it.
    pub fn send(
        &self,
        session_id: &str,
        message: &str,
        project_path: Option<&str>,
    ) -> Result<SendReceipt> {
        tracing::info!(session_id, "Sending message to session");

        let path = self.resolve(session_id, project_path)?;
        let context = self.load_context(&path);
        let record = build_user_record(&context, session_id, message);
        append_durable(&path, &record)?;

        let message_id = record.uuid.unwrap_or_default();
        tracing::info!(
            session_id,
            message_id = %message_id,
            parent_uuid = ?context.parent_uuid(),
            path = %path.display(),
            "Message appended"
        );

        Ok(SendReceipt {
            message_id,
            session_id: session_id.to_string(),
            file_path: path,
        })
    }

    /// Every decodable record of a session, in file order, as stored on disk.
    pub fn conversation(&self, session_id: &str, project_path: Option<&str>) -> Result<Vec<Value>> {
        let path = self.resolve(session_id, project_path)?;
        let bytes = std::fs::read(&path)?;
        let content = String::from_utf8_lossy(&bytes);

        let records = codec::non_blank_lines(&content)
            .into_iter()
            .filter_map(|(line_number, line)| match codec::decode_value(line) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        line_number,
                        error = %e,
                        "Skipping malformed line"
                    );
                    None
                }
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::RecordDefaults;
    use std::fs;
    use std::path::{Path, PathBuf};

    pub fn defaults() -> RecordDefaults {
        RecordDefaults {
            cwd: "/default/cwd".to_string(),
            version: "1.0.44".to_string(),
        }
    }

    /// Write a session log under `root/<project_dir>/<session_id>.jsonl`.
    pub fn write_session(
        root: &Path,
        project_dir: &str,
        session_id: &str,
        content: &str,
    ) -> PathBuf {
        let dir = root.join(project_dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{session_id}.jsonl"));
        fs::write(&path, content).unwrap();
        path
    }

    pub fn user_line(uuid: &str, parent: Option<&str>, text: &str) -> String {
        serde_json::json!({
            "parentUuid": parent,
            "isSidechain": false,
            "userType": "external",
            "cwd": "/Users/test/dev/app",
            "sessionId": "sess-1",
            "version": "1.0.80",
            "type": "user",
            "message": { "role": "user", "content": text },
            "uuid": uuid,
            "timestamp": "2025-06-01T10:00:00.000Z"
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_send_chains_to_last_record() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{}\n{}\n",
            user_line("U0", None, "first"),
            user_line("U1", Some("U0"), "second")
        );
        let path = write_session(tmp.path(), "-Users-test-dev-app", "sess-1", &content);
        let store = SessionStore::new(tmp.path().to_path_buf(), defaults());

        let receipt = store.send("sess-1", "third", None).unwrap();

        assert_eq!(receipt.session_id, "sess-1");
        assert_eq!(receipt.file_path, path);
        let after = std::fs::read_to_string(&path).unwrap();
        assert!(after.starts_with(&content));
        assert_eq!(after.lines().count(), 3);

        let appended = codec::decode(after.lines().last().unwrap()).unwrap();
        assert_eq!(appended.parent_uuid.as_deref(), Some("U1"));
        assert_eq!(appended.uuid.as_deref(), Some(receipt.message_id.as_str()));
        assert_eq!(appended.cwd.as_deref(), Some("/Users/test/dev/app"));
        assert_eq!(appended.version.as_deref(), Some("1.0.80"));
    }

    #[test]
    fn test_send_unknown_session() {
        let tmp = TempDir::new().unwrap();
        write_session(tmp.path(), "-Users-test-dev-app", "sess-1", "");
        let store = SessionStore::new(tmp.path().to_path_buf(), defaults());

        let err = store.send("abc", "hi", None).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(ref id) if id == "abc"));
        assert!(err.to_string().contains("session not found"));
    }

    #[test]
    fn test_conversation_skips_malformed_lines() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{}\n{{broken\n\n{}\n",
            user_line("U0", None, "first"),
            user_line("U1", Some("U0"), "second")
        );
        write_session(tmp.path(), "-Users-test-dev-app", "sess-1", &content);
        let store = SessionStore::new(tmp.path().to_path_buf(), defaults());

        let records = store.conversation("sess-1", None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["uuid"], "U0");
        assert_eq!(records[1]["uuid"], "U1");
    }

    #[test]
    fn test_log_suffix_normalized() {
        let store = SessionStore::new(PathBuf::from("/tmp"), defaults()).with_log_suffix(".log");
        assert_eq!(store.log_suffix(), "log");
    }
}
