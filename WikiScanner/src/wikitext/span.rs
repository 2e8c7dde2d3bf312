//! Byte ranges into page markup.
//!
//! Every finder in this module reports where a construct lives as a
//! `MarkupSpan` rather than copying the text out, so callers can slice the
//! original page (or splice a replacement into it) without re-scanning.

use serde::Serialize;

/// Half-open `start..end` byte range into a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MarkupSpan {
    pub start: usize,
    pub end: usize,
}

impl MarkupSpan {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "span start {start} is after end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Borrow the spanned text out of `source`.
    ///
    /// `source` must be the text the span was produced from.
    pub fn slice<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start..self.end]
    }
}

/// Replace the text covered by `span` in `source` with `replacement`.
pub fn replace_span(source: &str, span: MarkupSpan, replacement: &str) -> String {
    let mut out = String::with_capacity(source.len() - span.len() + replacement.len());
    out.push_str(&source[..span.start]);
    out.push_str(replacement);
    out.push_str(&source[span.end..]);
    out
}
