//! Record construction and durable appends.

use crate::codec;
use crate::error::Result;
use crate::types::{ConversationContext, MessageContent, Record, RecordMessage};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

/// Build an externally authored user record chained onto `context`.
///
/// `session_id` is the id the caller asked for, not the one inherited from
/// the last record, which may be stale.
pub fn build_user_record(context: &ConversationContext, session_id: &str, text: &str) -> Record {
    Record {
        parent_uuid: context.parent_uuid().map(str::to_string),
        is_sidechain: Some(false),
        user_type: Some("external".to_string()),
        cwd: Some(context.cwd.clone()),
        session_id: Some(session_id.to_string()),
        version: Some(context.version.clone()),
        record_type: Some("user".to_string()),
        message: Some(RecordMessage {
            role: Some("user".to_string()),
            content: Some(MessageContent::Text(text.to_string())),
            ..Default::default()
        }),
        uuid: Some(uuid::Uuid::new_v4().to_string()),
        timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        extra: Default::default(),
    }
}

/// Append one encoded record to an existing log and bump its mtime.
///
/// The line goes out in a single `write_all` on an append-mode handle so
/// concurrent readers never observe a partial record. If the log does not end
/// in a newline (an interrupted write by the agent), one is written first so
/// the new record starts on its own line. The file is never created here.
///
/// The mtime is set explicitly because some watchers key off it and an
/// append alone does not reliably produce a change notification.
pub fn append_durable(path: &Path, record: &Record) -> Result<()> {
    let encoded = codec::encode(record)?;

    let mut file = OpenOptions::new().read(true).append(true).open(path)?;

    let mut buf = String::with_capacity(encoded.len() + 1);
    if !ends_with_newline(&mut file)? {
        tracing::warn!(
            path = %path.display(),
            "Log does not end with a newline, terminating last line"
        );
        buf.push('\n');
    }
    buf.push_str(&encoded);

    file.write_all(buf.as_bytes())?;
    file.sync_data()?;
    file.set_modified(SystemTime::now())?;

    tracing::debug!(path = %path.display(), bytes = buf.len(), "Record appended");
    Ok(())
}

/// True for empty files and files whose last byte is `\n`.
fn ends_with_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::test_support::*;
    use crate::session::load_context;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_record_fields() {
        let ctx = ConversationContext {
            last_record: Some(codec::decode(&user_line("U1", None, "x")).unwrap()),
            cwd: "/Users/test/dev/app".to_string(),
            version: "1.0.80".to_string(),
            session_id: Some("stale-id".to_string()),
        };

        let record = build_user_record(&ctx, "requested-id", "hello");

        assert_eq!(record.parent_uuid.as_deref(), Some("U1"));
        assert_eq!(record.is_sidechain, Some(false));
        assert_eq!(record.user_type.as_deref(), Some("external"));
        assert_eq!(record.session_id.as_deref(), Some("requested-id"));
        assert_eq!(record.record_type.as_deref(), Some("user"));
        assert_eq!(record.cwd.as_deref(), Some("/Users/test/dev/app"));
        assert_eq!(record.version.as_deref(), Some("1.0.80"));
        let message = record.message.as_ref().unwrap();
        assert_eq!(message.role.as_deref(), Some("user"));
        assert_eq!(message.content, Some(MessageContent::Text("hello".to_string())));
        assert!(uuid::Uuid::parse_str(record.uuid.as_deref().unwrap()).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(record.timestamp.as_deref().unwrap()).is_ok());
        assert!(record.timestamp.as_deref().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_fresh_uuid_per_record() {
        let ctx = ConversationContext::empty(&defaults());
        let a = build_user_record(&ctx, "s", "x");
        let b = build_user_record(&ctx, "s", "x");
        assert_ne!(a.uuid, b.uuid);
        assert!(a.parent_uuid.is_none());
    }

    #[test]
    fn test_append_is_pure_suffix() {
        let tmp = TempDir::new().unwrap();
        let before = format!("{}\n", user_line("U0", None, "a"));
        let path = write_session(tmp.path(), "-Users-a", "s", &before);

        let record = build_user_record(&load_context(&path, &defaults()), "s", "next");
        append_durable(&path, &record).unwrap();

        let after = std::fs::read_to_string(&path).unwrap();
        assert_eq!(after, format!("{before}{}", codec::encode(&record).unwrap()));
    }

    #[test]
    fn test_append_to_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_session(tmp.path(), "-Users-a", "s", "");

        let record = build_user_record(&load_context(&path, &defaults()), "s", "first");
        append_durable(&path, &record).unwrap();

        let after = std::fs::read_to_string(&path).unwrap();
        assert_eq!(after, codec::encode(&record).unwrap());
        assert!(codec::decode(&after).unwrap().parent_uuid.is_none());
    }

    #[test]
    fn test_append_after_partial_line() {
        let tmp = TempDir::new().unwrap();
        let before = format!("{}\n{{\"partial", user_line("U0", None, "a"));
        let path = write_session(tmp.path(), "-Users-a", "s", &before);

        let record = build_user_record(&load_context(&path, &defaults()), "s", "next");
        assert_eq!(record.parent_uuid.as_deref(), Some("U0"));
        append_durable(&path, &record).unwrap();

        let after = std::fs::read_to_string(&path).unwrap();
        assert!(after.starts_with(&before));
        let last = after.lines().last().unwrap();
        assert_eq!(codec::decode(last).unwrap(), record);
    }

    #[test]
    fn test_append_refreshes_mtime() {
        let tmp = TempDir::new().unwrap();
        let path = write_session(tmp.path(), "-Users-a", "s", "");
        let old = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .append(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let record = build_user_record(&ConversationContext::empty(&defaults()), "s", "x");
        append_durable(&path, &record).unwrap();

        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert!(mtime > old + Duration::from_secs(60));
    }

    #[test]
    fn test_append_never_creates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.jsonl");
        let record = build_user_record(&ConversationContext::empty(&defaults()), "s", "x");

        let err = append_durable(&path, &record).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!path.exists());
    }
}
