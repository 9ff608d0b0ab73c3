//! Per-turn citation storage.
//!
//! Source lists are keyed by the turn's distance from the end of the
//! transcript at the time the response metadata arrived, not by message id.
//! The backend emits that from-end key on the `x-message-index` header, so
//! the scheme is part of the wire contract and is preserved exactly: lookup
//! keys must be recomputed on every render pass, because an older message's
//! key grows as new messages are appended after it.

use std::collections::HashMap;

use client::SourceDocument;

/// Mapping from from-end turn key to the source snippets cited for that
/// turn. Grows monotonically; cleared only when the session is reset.
#[derive(Default)]
pub struct SourceMap {
    sources: HashMap<String, Vec<SourceDocument>>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap {
            sources: HashMap::new(),
        }
    }

    /// The lookup key for the message at `index` in a transcript of
    /// `transcript_len` messages: its current distance from the end.
    pub fn key_for(transcript_len: usize, index: usize) -> String {
        (transcript_len - 1 - index).to_string()
    }

    pub fn record(&mut self, turn_key: impl Into<String>, docs: Vec<SourceDocument>) {
        self.sources.insert(turn_key.into(), docs);
    }

    pub fn lookup(&self, turn_key: &str) -> Option<&[SourceDocument]> {
        self.sources.get(turn_key).map(Vec::as_slice)
    }

    /// Sources for the message at `index` of a `transcript_len`-long
    /// transcript, under the current from-end keying.
    pub fn for_message(&self, transcript_len: usize, index: usize) -> Option<&[SourceDocument]> {
        self.lookup(&Self::key_for(transcript_len, index))
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }
}
