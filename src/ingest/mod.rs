//! Chat export ingestion.
//!
//! Loads the exported chat JSON and normalizes it into [`crate::models::Message`]
//! values suitable for threading and indexing. Only elements of the `messages`
//! array with `type == "message"` and a `text` field are ingested; everything
//! else (service events, pinned-message markers, ...) is skipped.

pub mod parser;

pub use parser::{ChatExport, IngestError, load_export};
