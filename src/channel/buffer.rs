//! Pattern buffer with efficient tail-search optimization.
//!
//! Accumulates cleaned terminal output and searches only the last N bytes
//! for prompt patterns (scrapli-style tail search). For large outputs — a
//! full flat running configuration, interface tables — this keeps prompt
//! detection O(search_depth) per chunk instead of O(buffer).

use std::ops::Range;

use regex::bytes::Regex;

/// Buffer for accumulating output and efficiently searching for prompts.
///
/// Terminal control sequences and carriage returns are stripped on ingest,
/// so every pattern match runs against clean text. Prompt patterns are
/// expected to be `\z`-anchored; a match therefore only succeeds when the
/// prompt is the very last thing the device sent.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated, control-stripped output.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes and
    /// carriage returns.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer
            .extend(cleaned.into_iter().filter(|&b| b != b'\r'));
    }

    /// Search the tail of the buffer for a `\z`-anchored prompt pattern.
    ///
    /// Returns the match range in absolute buffer offsets.
    pub fn find_tail(&self, pattern: &Regex) -> Option<Range<usize>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        let tail = &self.buffer[start..];
        pattern
            .find(tail)
            .map(|m| (start + m.start())..(start + m.end()))
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.find_tail(pattern).is_some()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the search depth setting.
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(2000)
    }
}
