//! Reply-chain flattening.
//!
//! ## Algorithm
//!
//! 1. Build a lookup from message id to message.
//! 2. For each message, walk the `reply_to` chain upward until reaching a
//!    message with no resolvable parent; that terminal id is the thread root.
//!    A `reply_to` pointing at an id missing from the export counts as "no
//!    parent", so the message anchors its own thread.
//! 3. Bucket each message under its root. Buckets start with the root message
//!    itself, so it appears exactly once and always first; replies follow in
//!    export order.
//!
//! Threads are kept in discovery order (the order their first member appears
//! in the export), which later doubles as the ranking tie-break.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Message;

/// Errors raised while grouping messages into threads.
#[derive(Debug, Error)]
pub enum ThreadingError {
    #[error("malformed thread graph: reply cycle involving message {message_id}")]
    MalformedGraph { message_id: i64 },
}

/// One reply-thread: the root message followed by every message whose reply
/// chain terminates at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub root_id: i64,
    pub messages: Vec<Message>,
}

impl Thread {
    /// Space-joined text of all member messages, the document fed to the index.
    pub fn joined_text(&self) -> String {
        self.messages
            .iter()
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// All threads of an export, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadSet {
    threads: Vec<Thread>,
}

impl ThreadSet {
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    /// Thread at a given discovery-order position.
    pub fn thread_at(&self, index: usize) -> Option<&Thread> {
        self.threads.get(index)
    }

    /// Thread anchored at the given root message id.
    pub fn get(&self, root_id: i64) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.root_id == root_id)
    }
}

/// Group messages into threads keyed by their resolved root message.
pub fn build_threads(messages: &[Message]) -> Result<ThreadSet, ThreadingError> {
    let by_id: HashMap<i64, &Message> = messages.iter().map(|msg| (msg.id, msg)).collect();

    let mut order: Vec<i64> = Vec::new();
    let mut buckets: HashMap<i64, Vec<Message>> = HashMap::new();

    for msg in messages {
        let root_id = resolve_root(msg, &by_id)?;

        let bucket = match buckets.entry(root_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                order.push(root_id);
                let mut members = Vec::new();
                if let Some(root) = by_id.get(&root_id) {
                    members.push((*root).clone());
                }
                entry.insert(members)
            }
        };

        if msg.id != root_id {
            bucket.push(msg.clone());
        }
    }

    let threads = order
        .into_iter()
        .filter_map(|root_id| {
            buckets.remove(&root_id).map(|messages| Thread {
                root_id,
                messages,
            })
        })
        .collect();

    Ok(ThreadSet { threads })
}

/// Walk the reply chain upward to the terminal ancestor.
///
/// The visited set bounds the walk: revisiting an id means the export contains
/// a reply cycle, which is reported instead of followed.
fn resolve_root(msg: &Message, by_id: &HashMap<i64, &Message>) -> Result<i64, ThreadingError> {
    let mut visited: HashSet<i64> = HashSet::new();
    let mut current = msg;

    loop {
        if !visited.insert(current.id) {
            return Err(ThreadingError::MalformedGraph {
                message_id: current.id,
            });
        }

        match current.reply_to.and_then(|parent_id| by_id.get(&parent_id)) {
            Some(parent) => current = parent,
            None => return Ok(current.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, reply_to: Option<i64>) -> Message {
        Message {
            id,
            text: format!("message {id}"),
            reply_to,
            from: "tester".to_string(),
            date: "2024-01-01T00:00:00".to_string(),
        }
    }

    #[test]
    fn messages_without_parents_are_roots() {
        let messages = vec![message(1, None), message(2, None)];
        let threads = build_threads(&messages).expect("acyclic");

        assert_eq!(threads.len(), 2);
        assert_eq!(threads.get(1).map(|t| t.messages.len()), Some(1));
        assert_eq!(threads.get(2).map(|t| t.messages.len()), Some(1));
    }

    #[test]
    fn multi_level_chain_resolves_to_ultimate_root() {
        // C replies to B, B replies to A, A has no parent.
        let messages = vec![message(1, None), message(2, Some(1)), message(3, Some(2))];
        let threads = build_threads(&messages).expect("acyclic");

        assert_eq!(threads.len(), 1);
        let thread = threads.get(1).expect("root thread");
        let ids: Vec<i64> = thread.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn dangling_reply_pointer_becomes_own_root() {
        let messages = vec![message(5, Some(999)), message(6, Some(5))];
        let threads = build_threads(&messages).expect("acyclic");

        assert_eq!(threads.len(), 1);
        let thread = threads.get(5).expect("thread rooted at 5");
        let ids: Vec<i64> = thread.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn every_message_lands_in_exactly_one_thread_with_root_first() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, None),
            message(4, Some(2)),
            message(5, Some(3)),
        ];
        let threads = build_threads(&messages).expect("acyclic");

        let mut seen: Vec<i64> = Vec::new();
        for thread in threads.iter() {
            assert_eq!(thread.messages[0].id, thread.root_id);
            for member in &thread.messages {
                assert!(!seen.contains(&member.id), "message {} duplicated", member.id);
                seen.push(member.id);
            }
        }
        assert_eq!(seen.len(), messages.len());
    }

    #[test]
    fn reply_before_root_still_puts_root_first() {
        // The reply appears earlier in the export than the root it points at.
        let messages = vec![message(2, Some(1)), message(1, None)];
        let threads = build_threads(&messages).expect("acyclic");

        assert_eq!(threads.len(), 1);
        let thread = threads.get(1).expect("thread rooted at 1");
        let ids: Vec<i64> = thread.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn reply_cycle_is_reported_not_followed() {
        let messages = vec![message(1, Some(2)), message(2, Some(1))];
        let err = build_threads(&messages).unwrap_err();
        assert!(matches!(err, ThreadingError::MalformedGraph { .. }));
    }

    #[test]
    fn self_reply_is_a_malformed_graph() {
        let messages = vec![message(1, Some(1))];
        let err = build_threads(&messages).unwrap_err();
        assert!(matches!(
            err,
            ThreadingError::MalformedGraph { message_id: 1 }
        ));
    }

    #[test]
    fn discovery_order_is_export_order() {
        let messages = vec![
            message(10, None),
            message(20, None),
            message(11, Some(10)),
        ];
        let threads = build_threads(&messages).expect("acyclic");

        let roots: Vec<i64> = threads.iter().map(|t| t.root_id).collect();
        assert_eq!(roots, vec![10, 20]);
    }
}
