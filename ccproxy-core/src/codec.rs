//! Conversation log line codec
//!
//! A conversation log is newline-delimited JSON, one [`Record`] per line.
//! A line is malformed only when it is not a JSON object; known fields with
//! unexpected types are kept untyped rather than rejected. Malformed lines
//! are never fatal for the file: callers skip [`Error::MalformedLine`] and
//! keep going.

use crate::error::{Error, Result};
use crate::types::{MessageContent, Record};
use serde_json::Value;

/// Preview used when a record has no message content at all.
pub const NO_CONTENT: &str = "[No content]";

/// Preview used when a block list carries no text.
pub const NON_TEXT_CONTENT: &str = "[Tool use or other content]";

/// Longest excerpt of a bad line included in error messages and logs.
const EXCERPT_CHARS: usize = 50;

/// Decode one log line into a record.
pub fn decode(line: &str) -> Result<Record> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Error::MalformedLine("blank line".to_string()));
    }
    if !trimmed.starts_with('{') {
        return Err(Error::MalformedLine(format!(
            "{} (not a JSON object)",
            excerpt(trimmed)
        )));
    }

    serde_json::from_str(trimmed)
        .map_err(|e| Error::MalformedLine(format!("{} ({})", excerpt(trimmed), e)))
}

/// Decode one log line into an untyped JSON object, as stored on disk.
pub fn decode_value(line: &str) -> Result<Value> {
    let trimmed = line.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(Error::MalformedLine(format!(
            "{} (not a JSON object)",
            excerpt(trimmed)
        ))),
        Err(e) => Err(Error::MalformedLine(format!("{} ({})", excerpt(trimmed), e))),
    }
}

/// Encode a record as one log line, including the trailing newline.
pub fn encode(record: &Record) -> Result<String> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

/// Display text for a record.
///
/// Plain string content is returned verbatim. For block lists, the text of
/// every `text` block is joined with single spaces.
pub fn extract_preview(record: &Record) -> String {
    let Some(content) = record.message.as_ref().and_then(|m| m.content.as_ref()) else {
        return NO_CONTENT.to_string();
    };

    match content {
        MessageContent::Text(text) if !text.is_empty() => text.clone(),
        MessageContent::Text(_) => NO_CONTENT.to_string(),
        MessageContent::Blocks(blocks) => {
            let joined = blocks
                .iter()
                .filter(|block| block.is_text())
                .map(|block| block.text.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                NON_TEXT_CONTENT.to_string()
            } else {
                joined
            }
        }
        MessageContent::Other(_) => NO_CONTENT.to_string(),
    }
}

/// The non-blank lines of a log, paired with 1-based line numbers.
pub fn non_blank_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line))
        .collect()
}

/// Short prefix of a line for diagnostics.
pub fn excerpt(line: &str) -> String {
    let mut chars = line.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
