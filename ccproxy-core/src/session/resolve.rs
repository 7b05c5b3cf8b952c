//! Session id to log file resolution.

use crate::error::{Error, Result};
use crate::project_path::candidate_dir_names;
use std::path::{Path, PathBuf};

/// Reject ids that could name anything other than a file in a project directory.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    let invalid = session_id.is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains(&['/', '\\', '\0'][..]);

    if invalid {
        return Err(Error::InvalidSessionId(session_id.to_string()));
    }
    Ok(())
}

/// Find the log file backing `session_id`.
///
/// When `project_path` is given, that project's directory is checked first.
/// Otherwise, or when it has no such file, every project directory is
/// searched in name order and the first match wins.
pub fn resolve_session_file(
    projects_dir: &Path,
    log_suffix: &str,
    session_id: &str,
    project_path: Option<&str>,
) -> Result<PathBuf> {
    validate_session_id(session_id)?;
    let file_name = format!("{session_id}.{log_suffix}");

    if let Some(project_path) = project_path.filter(|p| !p.is_empty()) {
        for dir_name in candidate_dir_names(project_path) {
            if matches!(dir_name.as_str(), "." | "..") {
                continue;
            }
            let candidate = projects_dir.join(&dir_name).join(&file_name);
            if candidate.is_file() {
                tracing::debug!(
                    session_id,
                    path = %candidate.display(),
                    "Resolved from project hint"
                );
                return Ok(candidate);
            }
        }
        tracing::debug!(session_id, project_path, "Project hint missed, scanning all projects");
    }

    let pattern = format!(
        "{}/*/{}",
        glob::Pattern::escape(&projects_dir.to_string_lossy()),
        glob::Pattern::escape(&file_name)
    );
    let entries = glob::glob(&pattern).map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid session glob pattern {pattern}: {e}"),
        ))
    })?;

    entries
        .flatten()
        .find(|path| path.is_file())
        .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
}
