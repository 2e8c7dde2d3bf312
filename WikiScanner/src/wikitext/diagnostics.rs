//! Diagnostics for markup the finders had to skip.
//!
//! An opening token whose closing token never arrives does not stop a scan:
//! the finder records a `Malformed` entry, logs it at `warn`, and carries on
//! after the bad opening token.

use crate::wikitext::enums::Grammar;
use crate::wikitext::errors::WtError;
use crate::wikitext::span::MarkupSpan;

/// Characters of surrounding text kept in a diagnostic by default.
pub const DEFAULT_CONTEXT_CHARS: usize = 100;

/// Optional information attached to diagnostics. Only used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticContext<'a> {
    /// Title of the page being scanned, if the caller knows it.
    pub title: Option<&'a str>,
    /// How many characters of text after the bad token to keep.
    pub context_chars: usize,
}

impl Default for DiagnosticContext<'_> {
    fn default() -> Self {
        Self {
            title: None,
            context_chars: DEFAULT_CONTEXT_CHARS,
        }
    }
}

impl<'a> DiagnosticContext<'a> {
    pub fn for_page(title: &'a str) -> Self {
        Self {
            title: Some(title),
            ..Self::default()
        }
    }

    pub fn with_context_chars(self, context_chars: usize) -> Self {
        Self {
            context_chars,
            ..self
        }
    }

    /// Text starting at `at`, cut to `context_chars` characters.
    pub fn excerpt(&self, text: &str, at: usize) -> String {
        text[at..].chars().take(self.context_chars).collect()
    }
}

/// A construct that was opened but never closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub grammar: Grammar,
    /// Span of the unmatched opening token.
    pub span: MarkupSpan,
    /// Text starting at the opening token, cut to the configured length.
    pub excerpt: String,
    pub title: Option<String>,
}

impl Malformed {
    /// Record and log an unmatched `grammar` opening token at `open_at`.
    pub(crate) fn report(
        text: &str,
        grammar: Grammar,
        open_at: usize,
        ctx: &DiagnosticContext<'_>,
    ) -> Self {
        let excerpt = ctx.excerpt(text, open_at);
        let span = MarkupSpan::new(open_at, open_at + grammar.open().len());
        log::warn!(
            "Error: {} end not found ({}) at {}: {:?}",
            grammar,
            ctx.title.unwrap_or("<untitled>"),
            open_at,
            excerpt
        );
        Self {
            grammar,
            span,
            excerpt,
            title: ctx.title.map(str::to_owned),
        }
    }
}

/// The `Malformed` records of one scan over one text, at most one per
/// opening token.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics<'c> {
    ctx: DiagnosticContext<'c>,
    records: Vec<Malformed>,
}

impl<'c> Diagnostics<'c> {
    pub fn new(ctx: DiagnosticContext<'c>) -> Self {
        Self {
            ctx,
            records: Vec::new(),
        }
    }

    pub fn context(&self) -> &DiagnosticContext<'c> {
        &self.ctx
    }

    /// Record an unmatched `grammar` opening token at `open_at` in `text`.
    /// A token that was already recorded is ignored.
    pub(crate) fn report(&mut self, text: &str, grammar: Grammar, open_at: usize) {
        if self.records.iter().any(|m| m.span.start == open_at) {
            return;
        }
        self.records
            .push(Malformed::report(text, grammar, open_at, &self.ctx));
    }

    pub fn records(&self) -> &[Malformed] {
        &self.records
    }
}

impl From<Malformed> for WtError {
    fn from(m: Malformed) -> Self {
        WtError::malformed_at(
            format!("{} end not found", m.grammar),
            m.span.start,
            Some(m.excerpt),
        )
    }
}
