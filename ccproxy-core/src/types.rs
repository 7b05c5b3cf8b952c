//! Core domain types for ccproxy
//!
//! Two families of types live here:
//! - **Log records**: the on-disk shape of one line of a Claude Code
//!   conversation log, tolerant of fields this crate does not know about.
//! - **Derived views**: session summaries and conversation context, computed
//!   from the log files on every request and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

// ============================================
// Log records
// ============================================

/// One line of a conversation log.
///
/// Only the fields needed to chain and display records are typed. Everything
/// else is kept in [`Record::extra`] so a decoded record re-encodes without
/// losing data.
///
/// Deserialization accepts any JSON object. A known field holding a value of
/// an unexpected type is left in `extra` and the typed field stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Identifier of the causally preceding record. Always serialized,
    /// as `null` for the first record of a chain.
    pub parent_uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sidechain: Option<bool>,

    /// Author classification (`external` for records written by people)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Agent version that produced the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Record kind (`user`, `assistant`, `summary`, ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<RecordMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// RFC 3339 timestamp, kept verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `message` payload of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message content is either plain text or a list of typed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    /// Anything else, preserved as-is
    Other(Value),
}

/// One typed content block (`text`, `tool_use`, `tool_result`, `image`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentBlock {
    /// Returns true for blocks tagged as text.
    pub fn is_text(&self) -> bool {
        self.block_type.as_deref() == Some("text")
    }

    fn from_object(mut object: Map<String, Value>) -> Self {
        Self {
            block_type: take_string(&mut object, "type"),
            text: take_string(&mut object, "text"),
            extra: object,
        }
    }
}

impl Record {
    /// Build a record from a decoded JSON object, typing what fits.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        // Always re-serialized by the typed field, so never kept in `extra`.
        let parent_uuid = match object.remove("parentUuid") {
            Some(Value::String(parent)) => Some(parent),
            _ => None,
        };

        let message = match object.remove("message") {
            Some(Value::Object(message)) => Some(RecordMessage::from_object(message)),
            Some(other) => {
                object.insert("message".to_string(), other);
                None
            }
            None => None,
        };

        Self {
            parent_uuid,
            is_sidechain: take_bool(&mut object, "isSidechain"),
            user_type: take_string(&mut object, "userType"),
            cwd: take_string(&mut object, "cwd"),
            session_id: take_string(&mut object, "sessionId"),
            version: take_string(&mut object, "version"),
            record_type: take_string(&mut object, "type"),
            message,
            uuid: take_string(&mut object, "uuid"),
            timestamp: take_string(&mut object, "timestamp"),
            extra: object,
        }
    }
}

impl RecordMessage {
    fn from_object(mut object: Map<String, Value>) -> Self {
        let role = take_string(&mut object, "role");
        let content = match object.remove("content") {
            None => None,
            Some(Value::Null) => {
                object.insert("content".to_string(), Value::Null);
                None
            }
            Some(value) => Some(MessageContent::from_value(value)),
        };
        Self {
            role,
            content,
            extra: object,
        }
    }
}

impl MessageContent {
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => MessageContent::Text(text),
            Value::Array(items) if items.iter().all(Value::is_object) => MessageContent::Blocks(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(block) => Some(ContentBlock::from_object(block)),
                        _ => None,
                    })
                    .collect(),
            ),
            other => MessageContent::Other(other),
        }
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Record::from_object)
    }
}

impl<'de> Deserialize<'de> for RecordMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(RecordMessage::from_object)
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(ContentBlock::from_object)
    }
}

/// Remove `key` if it holds a string; otherwise leave it in place.
fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        Some(Value::String(_)) => match object.remove(key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

/// Remove `key` if it holds a bool; otherwise leave it in place.
fn take_bool(object: &mut Map<String, Value>, key: &str) -> Option<bool> {
    let value = object.get(key)?.as_bool()?;
    object.remove(key);
    Some(value)
}

// ============================================
// Derived views
// ============================================

/// Summary of one conversation log, as returned by the session listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Log file stem
    pub session_id: String,
    /// Project path decoded from the directory name
    pub project_path: String,
    pub file_path: PathBuf,
    /// File modification time; `None` if the file could not be stat'ed
    pub last_modified: Option<DateTime<Utc>>,
    /// Preview text of the last record
    pub last_message: String,
    /// Number of non-blank lines
    pub message_count: usize,
}

/// Request-scoped state recovered from the tail of a conversation log.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    /// Most recent record that decoded successfully
    pub last_record: Option<Record>,
    /// Working directory inherited from `last_record`, or the default
    pub cwd: String,
    /// Format version inherited from `last_record`, or the default
    pub version: String,
    /// Session id carried by `last_record`, if any
    pub session_id: Option<String>,
}

impl ConversationContext {
    /// Context for a log with nothing usable in it.
    pub fn empty(defaults: &RecordDefaults) -> Self {
        Self {
            last_record: None,
            cwd: defaults.cwd.clone(),
            version: defaults.version.clone(),
            session_id: None,
        }
    }

    /// Identifier the next appended record should point back to.
    pub fn parent_uuid(&self) -> Option<&str> {
        self.last_record.as_ref().and_then(|r| r.uuid.as_deref())
    }
}

/// Process-level fallbacks for inherited record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefaults {
    pub cwd: String,
    pub version: String,
}

/// Outcome of a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// `uuid` of the appended record
    pub message_id: String,
    pub session_id: String,
    pub file_path: PathBuf,
}
