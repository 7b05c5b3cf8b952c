//! Project directory naming
//!
//! Claude Code keys its conversation logs by project: each project gets one
//! directory under `~/.claude/projects` whose name is the absolute project
//! path with every `/` replaced by `-`.
//!
//! ```text
//! /Users/me/dev/app  <->  Users-me-dev-app   (canonical form)
//!                         -Users-me-dev-app  (form written by the agent)
//! ```
//!
//! The substitution is lossy for path segments that themselves contain `-`:
//! `/a/b-c` and `/a/b/c` share a directory name. Decoding always yields the
//! all-slashes reading. The agent owns the directories, so the naming cannot
//! be changed here; lookups by project path therefore only narrow the search
//! and never replace the exhaustive scan.

/// Path separator in project paths.
const SEPARATOR: char = '/';

/// Character standing in for the separator in directory names.
const FILLER: char = '-';

/// Encode an absolute project path as a directory name (canonical form).
///
/// Separators become filler characters and a single leading filler is
/// stripped, so `/Users/me/app` encodes to `Users-me-app`.
pub fn encode_project_path(project_path: &str) -> String {
    let replaced = project_path.replace(SEPARATOR, &FILLER.to_string());
    match replaced.strip_prefix(FILLER) {
        Some(rest) => rest.to_string(),
        None => replaced,
    }
}

/// Decode a project directory name back into an absolute path.
///
/// Accepts both the canonical form and the agent's on-disk form with its
/// leading filler: `Users-me-app` and `-Users-me-app` both decode to
/// `/Users/me/app`.
pub fn decode_project_path(dir_name: &str) -> String {
    let body = dir_name.strip_prefix(FILLER).unwrap_or(dir_name);
    let mut decoded = String::with_capacity(body.len() + 1);
    decoded.push(SEPARATOR);
    decoded.push_str(&body.replace(FILLER, &SEPARATOR.to_string()));
    decoded
}

/// Directory names a project path may be stored under, most likely first.
///
/// Returns the agent's on-disk form (leading filler kept) and the canonical
/// form, without duplicates.
pub fn candidate_dir_names(project_path: &str) -> Vec<String> {
    let canonical = encode_project_path(project_path);
    let on_disk = format!("{FILLER}{canonical}");

    if canonical.is_empty() {
        return vec![on_disk];
    }
    vec![on_disk, canonical]
}
