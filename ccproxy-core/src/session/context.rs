//! Conversation context recovery from the tail of a log.

use crate::codec;
use crate::types::{ConversationContext, RecordDefaults};
use std::path::Path;

/// Recover the last valid record of a log and the fields a new record inherits.
///
/// Lines are tried from the end backwards, so a trailing line left half
/// written by the agent falls back to the last good record. Unreadable,
/// empty and fully malformed files all produce [`ConversationContext::empty`].
pub fn load_context(path: &Path, defaults: &RecordDefaults) -> ConversationContext {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to read conversation context"
            );
            return ConversationContext::empty(defaults);
        }
    };
    let content = String::from_utf8_lossy(&bytes);

    for (line_number, line) in codec::non_blank_lines(&content).into_iter().rev() {
        let record = match codec::decode(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line_number,
                    excerpt = %codec::excerpt(line.trim()),
                    error = %e,
                    "Skipping invalid JSON line"
                );
                continue;
            }
        };

        let cwd = record
            .cwd
            .clone()
            .filter(|cwd| !cwd.is_empty())
            .unwrap_or_else(|| defaults.cwd.clone());
        let version = record
            .version
            .clone()
            .filter(|version| !version.is_empty())
            .unwrap_or_else(|| defaults.version.clone());
        let session_id = record.session_id.clone();

        return ConversationContext {
            last_record: Some(record),
            cwd,
            version,
            session_id,
        };
    }

    tracing::warn!(path = %path.display(), "No valid JSON record found in conversation file");
    ConversationContext::empty(defaults)
}
