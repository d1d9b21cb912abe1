//! Parsing of the raw chat export format.
//!
//! The export is a single JSON document with an optional numeric chat `id` and
//! a `messages` array. A message's `text` is either a plain string or a list
//! of fragments (plain strings interleaved with formatting objects); fragments
//! that are not plain strings are discarded and the rest concatenated, so the
//! indexed text contains only what the sender typed.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::Message;

/// Fallback sender name for messages without a `from` field.
const UNKNOWN_SENDER: &str = "Unknown Sender";

/// Errors raised while loading the chat export. All of these are fatal at
/// startup; there is no partial ingest.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read export file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("export file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalized contents of a chat export file.
#[derive(Debug, Clone)]
pub struct ChatExport {
    /// Chat id from the export header, used by frontends to build message links.
    pub chat_id: Option<i64>,
    /// Ingested messages in export order.
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct RawExport {
    #[serde(default)]
    id: Option<i64>,
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<TextField>,
    #[serde(default)]
    reply_to_message_id: Option<i64>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// A `text` field is either one string or a list of fragments.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextField {
    Plain(String),
    Fragments(Vec<Value>),
}

impl TextField {
    fn flatten(self) -> String {
        match self {
            TextField::Plain(text) => text,
            TextField::Fragments(fragments) => fragments
                .into_iter()
                .filter_map(|fragment| match fragment {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
        }
    }
}

/// Load and normalize a chat export file.
pub fn load_export(path: &Path) -> Result<ChatExport, IngestError> {
    let data = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let raw: RawExport = serde_json::from_str(&data)?;

    let messages: Vec<Message> = raw
        .messages
        .into_iter()
        .filter(|msg| msg.kind == "message")
        .filter_map(|msg| {
            let text = msg.text?.flatten();
            Some(Message {
                id: msg.id,
                text,
                reply_to: msg.reply_to_message_id,
                from: msg.from.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
                date: msg.date.unwrap_or_default(),
            })
        })
        .collect();

    log::debug!(
        "ingested {} messages from {}",
        messages.len(),
        path.display()
    );

    Ok(ChatExport {
        chat_id: raw.id,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatExport {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("result.json");
        fs::write(&path, json).expect("write export");
        load_export(&path).expect("valid export")
    }

    #[test]
    fn plain_and_fragmented_text() {
        let export = parse(
            r#"{
                "id": 42,
                "messages": [
                    {"id": 1, "type": "message", "text": "hello there", "from": "alice", "date": "2024-01-01T10:00:00"},
                    {"id": 2, "type": "message", "text": ["see ", {"type": "link", "text": "this"}, " later"], "from": "bob", "date": "2024-01-01T10:01:00"}
                ]
            }"#,
        );

        assert_eq!(export.chat_id, Some(42));
        assert_eq!(export.messages.len(), 2);
        assert_eq!(export.messages[0].text, "hello there");
        assert_eq!(export.messages[1].text, "see  later");
    }

    #[test]
    fn skips_service_entries_and_missing_text() {
        let export = parse(
            r#"{
                "messages": [
                    {"id": 1, "type": "service", "text": "pinned a message"},
                    {"id": 2, "type": "message"},
                    {"id": 3, "type": "message", "text": "kept", "reply_to_message_id": 1}
                ]
            }"#,
        );

        assert_eq!(export.chat_id, None);
        assert_eq!(export.messages.len(), 1);
        assert_eq!(export.messages[0].id, 3);
        assert_eq!(export.messages[0].reply_to, Some(1));
    }

    #[test]
    fn defaults_sender_and_date() {
        let export = parse(r#"{"messages": [{"id": 7, "type": "message", "text": "hi"}]}"#);

        assert_eq!(export.messages[0].from, "Unknown Sender");
        assert_eq!(export.messages[0].date, "");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_export(Path::new("/nonexistent/result.json")).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
