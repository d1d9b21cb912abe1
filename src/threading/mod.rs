//! Message threading module
//!
//! Groups a flat list of chat messages into reply-threads. Every message with
//! a resolvable `reply_to` pointer is attached to the thread anchored at the
//! ultimate ancestor of its reply chain; messages without a resolvable parent
//! anchor threads of their own.
//!
//! The upward walk is bounded by a visited set, so a cycle in the reply graph
//! is reported as a malformed-graph error instead of looping forever.

pub mod builder;

pub use builder::{Thread, ThreadSet, ThreadingError, build_threads};
