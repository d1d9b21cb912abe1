use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

// ===== Core Data Models =====

/// A single chat message, immutable once loaded from the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Export-assigned message id.
    pub id: i64,
    /// Flattened message text (fragment lists are concatenated at ingest).
    pub text: String,
    /// Id of the message this one replies to, if any.
    pub reply_to: Option<i64>,
    /// Display name of the sender.
    pub from: String,
    /// Timestamp string as it appears in the export.
    pub date: String,
}

// ===== API Response Models =====

/// The best-matching message inside a thread that cleared the relevance bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    pub message_id: i64,
    pub text: String,
    pub sender: String,
    pub date: String,
}

impl SearchHit {
    /// Build a hit from the message selected as a thread's representative snippet.
    pub fn from_message(message: &Message) -> Self {
        SearchHit {
            message_id: message.id,
            text: message.text.clone(),
            sender: message.from.clone(),
            date: message.date.clone(),
        }
    }
}
