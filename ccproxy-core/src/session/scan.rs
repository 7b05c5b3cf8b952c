//! Session discovery across the projects directory.

use crate::codec;
use crate::project_path::decode_project_path;
use crate::types::SessionSummary;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Preview for sessions whose last record cannot be shown.
pub const NO_MESSAGES: &str = "No messages";

/// Enumerate every session log one level below `projects_dir`.
///
/// Sorted by modification time, most recent first; sessions whose time is
/// unknown sort last. A missing `projects_dir` yields an empty list, and a
/// file that cannot be read is still listed with a placeholder preview and a
/// zero count.
pub fn list_sessions(projects_dir: &Path, log_suffix: &str) -> Vec<SessionSummary> {
    if !projects_dir.is_dir() {
        tracing::debug!(path = %projects_dir.display(), "Projects directory not found");
        return Vec::new();
    }

    let pattern = format!(
        "{}/*/*.{}",
        glob::Pattern::escape(&projects_dir.to_string_lossy()),
        glob::Pattern::escape(log_suffix)
    );

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid session glob pattern");
            return Vec::new();
        }
    };

    let mut sessions = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => {
                if let Some(summary) = summarize_session_file(&path) {
                    sessions.push(summary);
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %e.path().display(), error = %e, "Skipping unreadable entry");
            }
        }
    }

    sessions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    tracing::debug!(count = sessions.len(), "Scanned sessions");
    sessions
}

fn summarize_session_file(path: &Path) -> Option<SessionSummary> {
    let session_id = path.file_stem()?.to_string_lossy().into_owned();
    let project_dir = path.parent()?.file_name()?.to_string_lossy().into_owned();

    let last_modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read modification time");
        })
        .ok();

    let (last_message, message_count) = match std::fs::read(path) {
        Ok(bytes) => preview_and_count(path, &String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read session file");
            (NO_MESSAGES.to_string(), 0)
        }
    };

    Some(SessionSummary {
        session_id,
        project_path: decode_project_path(&project_dir),
        file_path: path.to_path_buf(),
        last_modified,
        last_message,
        message_count,
    })
}

/// Preview of the last non-blank line and the number of non-blank lines.
fn preview_and_count(path: &Path, content: &str) -> (String, usize) {
    let lines = codec::non_blank_lines(content);

    let preview = match lines.last() {
        Some((line_number, line)) => match codec::decode(line) {
            Ok(record) => codec::extract_preview(&record),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    line_number,
                    error = %e,
                    "Last line is malformed"
                );
                NO_MESSAGES.to_string()
            }
        },
        None => NO_MESSAGES.to_string(),
    };

    (preview, lines.len())
}
