//! `WikiText`: one page's markup plus the page name used in diagnostics.
//!
//! The finders in `types` work on any `&str`; this wrapper threads the page
//! name and the configured context length into them so a warning about
//! broken markup says which page it came from.

use crate::wikitext::diagnostics::{DEFAULT_CONTEXT_CHARS, DiagnosticContext};
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::span::{MarkupSpan, replace_span};
use crate::wikitext::types::links::{ExternalLinks, InnerLinks, Link, find_external_links_with, find_inner_links_with};
use crate::wikitext::types::table::{FindTables, find_tables_with};
use crate::wikitext::types::templates::{FindTemplates, Template, find_all_templates_with, find_templates_with};

/// Page markup with an optional page name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiText {
    text: String,
    page_name: Option<String>,
    context_chars: usize,
}

impl WikiText {
    pub fn new<S: Into<String>>(input: S) -> Self {
        Self {
            text: input.into(),
            page_name: None,
            context_chars: DEFAULT_CONTEXT_CHARS,
        }
    }

    pub fn for_page<S: Into<String>, T: Into<String>>(page_name: T, input: S) -> Self {
        Self {
            page_name: Some(page_name.into()),
            ..Self::new(input)
        }
    }

    /// Set how much text after a broken construct is kept in diagnostics.
    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn page_name(&self) -> Option<&str> {
        self.page_name.as_deref()
    }

    /// Set the optional page name. Accepts `None` to clear it.
    pub fn set_page_name<S: Into<String>>(&mut self, page_name: Option<S>) {
        self.page_name = page_name.map(|s| s.into());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn ctx(&self) -> DiagnosticContext<'_> {
        DiagnosticContext {
            title: self.page_name.as_deref(),
            context_chars: self.context_chars,
        }
    }

    pub fn templates(&self, name: &str) -> FindTemplates<'_, '_> {
        find_templates_with(&self.text, name, self.ctx())
    }

    pub fn template(&self, name: &str) -> Option<Template> {
        self.templates(name).next()
    }

    pub fn all_templates(&self) -> FindTemplates<'_, '_> {
        find_all_templates_with(&self.text, self.ctx())
    }

    pub fn tables(&self) -> FindTables<'_, '_> {
        find_tables_with(&self.text, self.ctx())
    }

    pub fn inner_links(&self) -> InnerLinks<'_, '_> {
        find_inner_links_with(&self.text, self.ctx())
    }

    pub fn external_links(&self) -> ExternalLinks<'_, '_> {
        find_external_links_with(&self.text, self.ctx())
    }

    /// Internal and external links ordered by position.
    pub fn links(&self) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .inner_links()
            .map(Link::Internal)
            .chain(self.external_links().map(Link::External))
            .collect();
        links.sort_by_key(|l| l.span().start);
        links
    }

    /// Replace the text covered by `span`, e.g. a template found earlier, with
    /// `replacement`. Spans found before the edit are stale afterwards.
    pub fn replace_span(&mut self, span: MarkupSpan, replacement: &str) -> Result<()> {
        if span.end > self.text.len()
            || !self.text.is_char_boundary(span.start)
            || !self.text.is_char_boundary(span.end)
        {
            return Err(WtError::invalid_arg(format!(
                "span {}..{} does not fit a {}-byte page",
                span.start,
                span.end,
                self.text.len()
            )));
        }
        self.text = replace_span(&self.text, span, replacement);
        Ok(())
    }
}
