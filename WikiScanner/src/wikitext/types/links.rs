/*!
Internal (`[[target|text|...]]`) and external (`[url label]`) links.

Internal links are found wherever they occur, including inside template
parameters. A link nested in another link's text (image captions) is part
of the outer link and is not reported on its own. External links skip over
internal links entirely, so `[[http://x.com]]` is not an external link.
*/

use serde::Serialize;

use crate::wikitext::diagnostics::{DiagnosticContext, Malformed};
use crate::wikitext::enums::{Grammar, LinkType};
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::scanner::{find_matching_close, find_unshadowed};
use crate::wikitext::span::MarkupSpan;

/// `[[target|display text|...]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InnerLink {
    /// Link target with a leading `:` removed.
    pub target: String,
    /// The second segment, or the target as written when there is none.
    pub display_text: String,
    /// Every segment after the target, only set when there are more than two
    /// segments (file and image options).
    pub extra_params: Option<Vec<String>>,
    pub span: MarkupSpan,
}

impl InnerLink {
    pub fn to_wikitext(&self) -> String {
        match &self.extra_params {
            Some(params) => format!("[[{}|{}]]", self.target, params.join("|")),
            None if self.display_text == self.target
                || self.display_text.strip_prefix(':') == Some(self.target.as_str()) =>
            {
                format!("[[{}]]", self.display_text)
            }
            None => format!("[[{}|{}]]", self.target, self.display_text),
        }
    }
}

/// `[url label]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalLink {
    pub url: String,
    /// Empty for a bare `[url]`.
    pub label: String,
    pub span: MarkupSpan,
}

impl ExternalLink {
    /// The url as a parsed `url::Url`. Bracketed text that is not a url
    /// (`[citation needed]`) is an `InvalidArgument` error.
    pub fn parsed_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.url)
            .map_err(|e| WtError::invalid_arg(format!("invalid url '{}': {}", self.url, e)))
    }

    pub fn to_wikitext(&self) -> String {
        if self.label.is_empty() {
            format!("[{}]", self.url)
        } else {
            format!("[{} {}]", self.url, self.label)
        }
    }
}

/// Either kind of link, tagged with its type when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Link {
    Internal(InnerLink),
    External(ExternalLink),
}

impl Link {
    pub fn link_type(&self) -> LinkType {
        match self {
            Link::Internal(_) => LinkType::Internal,
            Link::External(_) => LinkType::External,
        }
    }

    pub fn span(&self) -> MarkupSpan {
        match self {
            Link::Internal(l) => l.span,
            Link::External(l) => l.span,
        }
    }

    pub fn to_wikitext(&self) -> String {
        match self {
            Link::Internal(l) => l.to_wikitext(),
            Link::External(l) => l.to_wikitext(),
        }
    }
}

fn split_segments(inner: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut cur = 0;
    while let Some(pipe) = find_unshadowed(inner, cur, "|") {
        segments.push(&inner[cur..pipe]);
        cur = pipe + 1;
    }
    segments.push(&inner[cur..]);
    segments
}

fn inner_link_from(inner: &str, span: MarkupSpan) -> InnerLink {
    let segments = split_segments(inner);
    let written = segments[0];
    let target = written.strip_prefix(':').unwrap_or(written);
    let display_text = segments.get(1).copied().unwrap_or(written);
    let extra_params =
        (segments.len() > 2).then(|| segments[1..].iter().map(|s| s.to_string()).collect());
    InnerLink {
        target: target.to_string(),
        display_text: display_text.to_string(),
        extra_params,
        span,
    }
}

fn external_link_from(inner: &str, span: MarkupSpan) -> ExternalLink {
    let inner = inner.trim();
    let (url, label) = match inner.find(char::is_whitespace) {
        Some(ws) => (&inner[..ws], inner[ws..].trim_start()),
        None => (inner, ""),
    };
    ExternalLink {
        url: url.to_string(),
        label: label.to_string(),
        span,
    }
}

/// Lazy internal link search, see `get_inner_links`.
#[derive(Debug)]
pub struct InnerLinks<'t, 'c> {
    text: &'t str,
    cursor: usize,
    ctx: DiagnosticContext<'c>,
    diagnostics: Vec<Malformed>,
}

impl InnerLinks<'_, '_> {
    pub fn diagnostics(&self) -> &[Malformed] {
        &self.diagnostics
    }
}

impl Iterator for InnerLinks<'_, '_> {
    type Item = InnerLink;

    fn next(&mut self) -> Option<InnerLink> {
        while self.cursor < self.text.len() {
            let Some(rel) = self.text[self.cursor..].find("[[") else {
                self.cursor = self.text.len();
                return None;
            };
            let start = self.cursor + rel;
            match find_matching_close(self.text, start + 2, Grammar::InternalLink) {
                Some(close) => {
                    self.cursor = close + 2;
                    let span = MarkupSpan::new(start, close + 2);
                    return Some(inner_link_from(&self.text[start + 2..close], span));
                }
                None => {
                    self.diagnostics.push(Malformed::report(
                        self.text,
                        Grammar::InternalLink,
                        start,
                        &self.ctx,
                    ));
                    self.cursor = start + 2;
                }
            }
        }
        None
    }
}

/// Lazy external link search, see `get_external_links`.
#[derive(Debug)]
pub struct ExternalLinks<'t, 'c> {
    text: &'t str,
    cursor: usize,
    ctx: DiagnosticContext<'c>,
    diagnostics: Vec<Malformed>,
}

impl ExternalLinks<'_, '_> {
    pub fn diagnostics(&self) -> &[Malformed] {
        &self.diagnostics
    }
}

impl Iterator for ExternalLinks<'_, '_> {
    type Item = ExternalLink;

    fn next(&mut self) -> Option<ExternalLink> {
        while self.cursor < self.text.len() {
            let Some(rel) = self.text[self.cursor..].find('[') else {
                self.cursor = self.text.len();
                return None;
            };
            let start = self.cursor + rel;
            if self.text[start + 1..].starts_with('[') {
                self.cursor = find_matching_close(self.text, start + 2, Grammar::InternalLink)
                    .map_or(start + 2, |close| close + 2);
                continue;
            }
            match find_matching_close(self.text, start + 1, Grammar::ExternalLink) {
                Some(close) => {
                    self.cursor = close + 1;
                    let span = MarkupSpan::new(start, close + 1);
                    return Some(external_link_from(&self.text[start + 1..close], span));
                }
                None => {
                    self.diagnostics.push(Malformed::report(
                        self.text,
                        Grammar::ExternalLink,
                        start,
                        &self.ctx,
                    ));
                    self.cursor = start + 1;
                }
            }
        }
        None
    }
}

pub fn find_inner_links_with<'t, 'c>(text: &'t str, ctx: DiagnosticContext<'c>) -> InnerLinks<'t, 'c> {
    InnerLinks {
        text,
        cursor: 0,
        ctx,
        diagnostics: Vec::new(),
    }
}

pub fn find_external_links_with<'t, 'c>(
    text: &'t str,
    ctx: DiagnosticContext<'c>,
) -> ExternalLinks<'t, 'c> {
    ExternalLinks {
        text,
        cursor: 0,
        ctx,
        diagnostics: Vec::new(),
    }
}

/// Every internal link in `text`, in order.
pub fn get_inner_links(text: &str) -> Vec<InnerLink> {
    find_inner_links_with(text, DiagnosticContext::default()).collect()
}

pub fn get_inner_link(text: &str) -> Option<InnerLink> {
    find_inner_links_with(text, DiagnosticContext::default()).next()
}

/// Every bracketed external link in `text`, in order.
pub fn get_external_links(text: &str) -> Vec<ExternalLink> {
    find_external_links_with(text, DiagnosticContext::default()).collect()
}

pub fn get_external_link(text: &str) -> Option<ExternalLink> {
    find_external_links_with(text, DiagnosticContext::default()).next()
}

/// Both kinds of links, ordered by position.
pub fn get_links(text: &str) -> Vec<Link> {
    let mut links: Vec<Link> = get_inner_links(text)
        .into_iter()
        .map(Link::Internal)
        .chain(get_external_links(text).into_iter().map(Link::External))
        .collect();
    links.sort_by_key(|l| l.span().start);
    links
}
