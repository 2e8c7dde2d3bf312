//! Template finding, parameter extraction and serialization.
//!
//! Templates have the form `{{Name|positional|key=value|...}}`. Parameter
//! separators and key/value splits are located with the depth-aware scanner,
//! so a `|` or `=` that belongs to a nested template, link or table never
//! splits the outer template.
//!
//! The reverse direction (`template_from_*`) is plain string assembly. Values
//! handed to it must not contain a raw top-level `|`; such a value would come
//! back as two parameters when re-parsed.

use itertools::Itertools;
use lazy_regex::regex_is_match;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::wikitext::diagnostics::{DiagnosticContext, Diagnostics, Malformed};
use crate::wikitext::enums::Grammar;
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::scanner::{ScanOptions, find_first_recovering, find_matching_close};
use crate::wikitext::span::MarkupSpan;

/// Numeric keys above this are kept as named parameters instead of growing
/// the positional list to that length.
pub const MAX_POSITIONAL_INDEX: usize = 10_000;

/// How `template_from_key_value_data` lays out parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateLayout {
    /// `{{Name|a=1|b=2}}`
    Inline,
    /// One parameter per line, the usual infobox shape:
    /// `{{Name\n|a=1\n|b=2\n}}`
    #[default]
    Multiline,
}

impl TemplateLayout {
    fn line_end(self) -> &'static str {
        match self {
            TemplateLayout::Inline => "",
            TemplateLayout::Multiline => "\n",
        }
    }
}

/// What `get_template_array_data` does with `key=value` segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayMode {
    /// Keep every segment in order, named ones as raw `key=value` text, so
    /// `template_from_array_data` writes them back unchanged.
    #[default]
    KeepNamed,
    /// Only bare values and numeric keys; other named parameters are dropped.
    PositionalOnly,
}

/// Named parameters in the order they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedParams(Vec<(String, String)>);

impl NamedParams {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Set `key` to `value`. An existing key keeps its position and the old
    /// value is returned; a new key goes to the end.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    /// Rename `from` to `to` in place. If `to` already exists it is dropped
    /// in favour of the renamed entry. Returns false when `from` is missing.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.contains_key(from);
        }
        let Some(pos) = self.0.iter().position(|(k, _)| k == from) else {
            return false;
        };
        self.0[pos].0 = to.to_string();
        if let Some(dup) = self
            .0
            .iter()
            .enumerate()
            .position(|(i, (k, _))| i != pos && k == to)
        {
            self.0.remove(dup);
        }
        true
    }

    pub fn retain<F: FnMut(&str, &str) -> bool>(&mut self, mut keep: F) {
        self.0.retain(|(k, v)| keep(k, v));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = NamedParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for NamedParams {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parameters of one template invocation.
///
/// A numeric key `n` lives in `positional[n - 1]`, never in `named`.
/// `None` marks a slot that was skipped (`{{T|3=x}}` has two).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateData {
    pub positional: Vec<Option<String>>,
    pub named: NamedParams,
}

impl TemplateData {
    fn set_positional(&mut self, index: usize, value: String) {
        if self.positional.len() <= index {
            self.positional.resize(index + 1, None);
        }
        self.positional[index] = Some(value);
    }
}

/// A template invocation found in page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: String,
    #[serde(flatten)]
    pub data: TemplateData,
    /// Where the whole `{{...}}` sits in the text it was found in.
    pub span: MarkupSpan,
}

impl Template {
    /// The original markup of this template.
    pub fn raw<'t>(&self, source: &'t str) -> &'t str {
        self.span.slice(source)
    }

    pub fn get_named(&self, key: &str) -> Result<&str> {
        self.data.named.get(key).ok_or_else(|| {
            WtError::not_found(format!(
                "Named parameter '{}' not found in template '{}'",
                key, self.name
            ))
        })
    }

    /// Positional parameter by 0-based index.
    pub fn get_positional(&self, index: usize) -> Result<&str> {
        match self.data.positional.get(index) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(WtError::not_found(format!(
                "Positional parameter {} is unset in template '{}'",
                index + 1,
                self.name
            ))),
            None => Err(WtError::index_oob(index, self.data.positional.len())),
        }
    }

    /// All parameters as one mapping: positional ones keyed `"1"`, `"2"`...
    /// followed by the named ones.
    pub fn key_value_data(&self) -> NamedParams {
        let mut out: NamedParams = self
            .data
            .positional
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| ((i + 1).to_string(), v.clone())))
            .collect();
        for (k, v) in self.data.named.iter() {
            out.insert(k, v);
        }
        out
    }

    pub fn to_wikitext(&self) -> String {
        template_from_template_data(&self.data, &self.name)
    }
}

/// One `|`-separated segment, classified.
enum Param<'a> {
    Bare(&'a str),
    Numbered(usize, &'a str),
    Named(&'a str, &'a str),
}

fn classify(segment: &str) -> Param<'_> {
    let segment = segment.trim();
    // an unclosed opening here was already reported while splitting segments
    let Some((eq, _)) = find_first_recovering(segment, 0, &["="], ScanOptions::default(), |_, _| {}) else {
        return Param::Bare(segment);
    };
    let key = segment[..eq].trim();
    let value = segment[eq + 1..].trim();
    if regex_is_match!(r"^[0-9]+$", key)
        && let Ok(n) = key.parse::<usize>()
        && (1..=MAX_POSITIONAL_INDEX).contains(&n)
    {
        return Param::Numbered(n, value);
    }
    Param::Named(key, value)
}

/// Split `source[start..end]`, the text between `{{` and `}}`, into the name
/// and the raw parameter segments, at top-level pipes only. A link or table
/// opened inside and never closed is reported and does not hide later pipes.
fn split_segments<'s>(
    source: &'s str,
    start: usize,
    end: usize,
    diagnostics: &mut Diagnostics<'_>,
) -> (&'s str, Vec<&'s str>) {
    let inner = &source[start..end];
    let mut next_pipe = |from: usize| {
        find_first_recovering(inner, from, &["|"], ScanOptions::default(), |grammar, at| {
            diagnostics.report(source, grammar, start + at)
        })
        .map(|(at, _)| at)
    };
    let Some(first) = next_pipe(0) else {
        return (inner.trim(), Vec::new());
    };
    let mut segments = Vec::new();
    let mut cur = first + 1;
    loop {
        match next_pipe(cur) {
            Some(next) => {
                segments.push(&inner[cur..next]);
                cur = next + 1;
            }
            None => {
                segments.push(&inner[cur..]);
                break;
            }
        }
    }
    (inner[..first].trim(), segments)
}

/// Offset of the `}}` ending `raw`, checking that `raw` is exactly one
/// template: it starts with `{{` and the matching `}}` is its last two bytes.
fn template_close(raw: &str, offset: usize, ctx: &DiagnosticContext<'_>) -> Result<usize> {
    let malformed = |msg: &str| WtError::malformed_at(msg, offset, Some(ctx.excerpt(raw, 0)));
    if !raw.starts_with("{{") {
        return Err(malformed("template text does not start with '{{'"));
    }
    match find_matching_close(raw, 2, Grammar::Template) {
        Some(close) if close + 2 == raw.len() => Ok(close),
        Some(_) => Err(malformed("text continues after the template's closing '}}'")),
        None => Err(malformed("template end not found")),
    }
}

fn parse_template_in(source: &str, span: MarkupSpan, diagnostics: &mut Diagnostics<'_>) -> Result<Template> {
    let raw = span.slice(source);
    let close = template_close(raw, span.start, diagnostics.context())?;
    let (name, segments) = split_segments(source, span.start + 2, span.start + close, diagnostics);
    if name.is_empty() {
        return Err(WtError::malformed_at(
            "empty template name",
            span.start,
            Some(diagnostics.context().excerpt(raw, 0)),
        ));
    }

    let mut data = TemplateData::default();
    let mut next_bare = 0usize;
    for segment in segments {
        match classify(segment) {
            Param::Bare(value) => {
                data.set_positional(next_bare, value.to_string());
                next_bare += 1;
            }
            Param::Numbered(n, value) => data.set_positional(n - 1, value.to_string()),
            Param::Named(key, value) => {
                data.named.insert(key, value);
            }
        }
    }

    Ok(Template {
        name: name.to_string(),
        data,
        span,
    })
}

/// Parse markup that is exactly one template invocation.
pub fn parse_template(text: &str) -> Result<Template> {
    parse_template_with(text, DiagnosticContext::default())
}

/// `parse_template`, with `ctx` used for error excerpts and for reporting
/// links or tables left open inside the template.
pub fn parse_template_with(text: &str, ctx: DiagnosticContext<'_>) -> Result<Template> {
    parse_template_in(text, MarkupSpan::new(0, text.len()), &mut Diagnostics::new(ctx))
}

/// Raw parameter segments of a text that must be exactly one template.
fn segments_of(template_text: &str) -> Result<Vec<&str>> {
    let mut diagnostics = Diagnostics::default();
    let close = template_close(template_text, 0, diagnostics.context())?;
    Ok(split_segments(template_text, 2, close, &mut diagnostics).1)
}

/// Positional and named parameters of one template invocation.
pub fn get_template_data(template_text: &str) -> Result<TemplateData> {
    parse_template(template_text).map(|t| t.data)
}

/// Every parameter of one template invocation as a single ordered mapping.
///
/// Bare values are keyed by their position (`"1"`, `"2"`...), numeric keys
/// are normalised (`01=` becomes `"1"`), and a later occurrence of a key
/// replaces the earlier value in place.
pub fn get_template_key_value_data(template_text: &str) -> Result<NamedParams> {
    let segments = segments_of(template_text)?;
    let mut out = NamedParams::new();
    let mut next_bare = 0usize;
    for segment in segments {
        match classify(segment) {
            Param::Bare(value) => {
                next_bare += 1;
                out.insert(next_bare.to_string(), value);
            }
            Param::Numbered(n, value) => {
                out.insert(n.to_string(), value);
            }
            Param::Named(key, value) => {
                out.insert(key, value);
            }
        }
    }
    Ok(out)
}

/// Positional view of one template invocation, see `ArrayMode`.
pub fn get_template_array_data(template_text: &str, mode: ArrayMode) -> Result<Vec<Option<String>>> {
    let segments = segments_of(template_text)?;
    let mut data = TemplateData::default();
    let mut next_bare = 0usize;
    for segment in segments {
        match (mode, classify(segment)) {
            (ArrayMode::KeepNamed, _) => {
                data.positional.push(Some(segment.trim().to_string()));
            }
            (ArrayMode::PositionalOnly, Param::Bare(value)) => {
                data.set_positional(next_bare, value.to_string());
                next_bare += 1;
            }
            (ArrayMode::PositionalOnly, Param::Numbered(n, value)) => {
                data.set_positional(n - 1, value.to_string());
            }
            (ArrayMode::PositionalOnly, Param::Named(..)) => {}
        }
    }
    Ok(data.positional)
}

/// `{{name|key=value|...}}`, parameters in mapping order.
pub fn template_from_key_value_data(data: &NamedParams, name: &str, layout: TemplateLayout) -> String {
    let eol = layout.line_end();
    let mut out = format!("{{{{{}{}", name, eol);
    for (key, value) in data.iter() {
        out.push('|');
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push_str(eol);
    }
    out.push_str("}}");
    out
}

/// `{{name|a|b|...}}`. Unset slots are written as empty parameters.
pub fn template_from_array_data<S: AsRef<str>>(data: &[Option<S>], name: &str) -> String {
    if data.is_empty() {
        return format!("{{{{{}}}}}", name);
    }
    let params = data
        .iter()
        .map(|v| v.as_ref().map_or("", |s| s.as_ref()))
        .join("|");
    format!("{{{{{}|{}}}}}", name, params)
}

/// `{{name|positional...|key=value...}}`.
pub fn template_from_template_data(data: &TemplateData, name: &str) -> String {
    let mut out = format!("{{{{{}", name);
    for value in &data.positional {
        out.push('|');
        out.push_str(value.as_deref().unwrap_or(""));
    }
    for (key, value) in data.named.iter() {
        out.push('|');
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out.push_str("}}");
    out
}

/// `{{name` must be followed by optional whitespace and then `|` or `}`, so a
/// search for `name` does not pick up `{{nameExtra}}`.
fn ends_at_name_boundary(after_name: &str) -> bool {
    matches!(after_name.trim_start().chars().next(), Some('|') | Some('}'))
}

/// Lazy template search over one text. See `find_templates` and
/// `find_all_templates`.
///
/// Unclosed templates are skipped; each is logged and kept in
/// `diagnostics()`.
#[derive(Debug)]
pub struct FindTemplates<'t, 'c> {
    text: &'t str,
    /// `{{` + name, or `None` for every top-level template.
    needle: Option<String>,
    cursor: usize,
    diagnostics: Diagnostics<'c>,
}

impl FindTemplates<'_, '_> {
    pub fn diagnostics(&self) -> &[Malformed] {
        self.diagnostics.records()
    }

    /// Next candidate opening: its offset and where its name ends (or where
    /// the `{{` ends, for the top-level search).
    fn next_candidate(&mut self) -> Option<(usize, usize)> {
        match &self.needle {
            Some(needle) => {
                let start = self.cursor + self.text[self.cursor..].find(needle.as_str())?;
                Some((start, start + needle.len()))
            }
            None => {
                let text = self.text;
                let diagnostics = &mut self.diagnostics;
                let (start, _) = find_first_recovering(
                    text,
                    self.cursor,
                    &["{{"],
                    ScanOptions::structural_target(),
                    |grammar, at| diagnostics.report(text, grammar, at),
                )?;
                Some((start, start + 2))
            }
        }
    }
}

impl Iterator for FindTemplates<'_, '_> {
    type Item = Template;

    fn next(&mut self) -> Option<Template> {
        while self.cursor < self.text.len() {
            let Some((start, after_open)) = self.next_candidate() else {
                self.cursor = self.text.len();
                return None;
            };
            if self.needle.is_some() && !ends_at_name_boundary(&self.text[after_open..]) {
                self.cursor = after_open;
                continue;
            }
            let Some(close) = find_matching_close(self.text, start + 2, Grammar::Template) else {
                self.diagnostics.report(self.text, Grammar::Template, start);
                self.cursor = after_open;
                continue;
            };
            let span = MarkupSpan::new(start, close + 2);
            self.cursor = span.end;
            match parse_template_in(self.text, span, &mut self.diagnostics) {
                Ok(template) => return Some(template),
                Err(e) => log::debug!("skipping template at {}: {}", start, e),
            }
        }
        None
    }
}

/// Every invocation of template `name` in `text`, in order. Templates of the
/// same name nested inside a match are part of that match, not separate
/// results.
pub fn find_templates<'t>(text: &'t str, name: &str) -> FindTemplates<'t, 'static> {
    find_templates_with(text, name, DiagnosticContext::default())
}

pub fn find_templates_with<'t, 'c>(
    text: &'t str,
    name: &str,
    ctx: DiagnosticContext<'c>,
) -> FindTemplates<'t, 'c> {
    FindTemplates {
        text,
        needle: Some(format!("{{{{{}", name)),
        cursor: 0,
        diagnostics: Diagnostics::new(ctx),
    }
}

/// First invocation of template `name`, if any.
pub fn find_template(text: &str, name: &str) -> Option<Template> {
    find_templates(text, name).next()
}

/// Every top-level template in `text`, whatever its name.
pub fn find_all_templates(text: &str) -> FindTemplates<'_, 'static> {
    find_all_templates_with(text, DiagnosticContext::default())
}

pub fn find_all_templates_with<'t, 'c>(
    text: &'t str,
    ctx: DiagnosticContext<'c>,
) -> FindTemplates<'t, 'c> {
    FindTemplates {
        text,
        needle: None,
        cursor: 0,
        diagnostics: Diagnostics::new(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_template_and_keeps_nested_value_whole() {
        let text = "intro {{Outer|a={{Inner|x|y}}|b=2}} end";
        let found: Vec<Template> = find_templates(text, "Outer").collect();
        assert_eq!(found.len(), 1);
        let outer = &found[0];
        assert_eq!(outer.name, "Outer");
        assert_eq!(outer.get_named("a").unwrap(), "{{Inner|x|y}}");
        assert_eq!(outer.get_named("b").unwrap(), "2");
        assert_eq!(outer.raw(text), "{{Outer|a={{Inner|x|y}}|b=2}}");
    }

    #[test]
    fn name_boundary_rejects_longer_names() {
        let text = "{{nameExtra|x}} {{name foo}} {{name\n|a=1}} {{name}}";
        let found: Vec<Template> = find_templates(text, "name").collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].get_named("a").unwrap(), "1");
        assert!(found[1].data.positional.is_empty());
        assert!(found[1].data.named.is_empty());
    }

    #[test]
    fn rejected_candidate_does_not_hide_nested_match() {
        let text = "{{nameExtra|{{name|inner}}}}";
        let found = find_template(text, "name").expect("nested match");
        assert_eq!(found.get_positional(0).unwrap(), "inner");
        assert_eq!(found.raw(text), "{{name|inner}}");
    }

    #[test]
    fn unclosed_template_is_skipped_with_diagnostic() {
        let text = "{{name|a {{name|b=1}}";
        let ctx = DiagnosticContext::for_page("Broken page");
        let mut finder = find_templates_with(text, "name", ctx);
        let found: Vec<Template> = finder.by_ref().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_named("b").unwrap(), "1");
        let diagnostics = finder.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span.start, 0);
        assert_eq!(diagnostics[0].title.as_deref(), Some("Broken page"));
    }

    #[test]
    fn hebrew_parameter_removal_scenario() {
        let text = "{{משרה|דרגה צבאית=אלוף|שנות שירות=1990-2000}}";
        let mut data = get_template_key_value_data(text).expect("parse");
        assert_eq!(data.remove("שנות שירות").as_deref(), Some("1990-2000"));
        assert_eq!(
            template_from_key_value_data(&data, "משרה", TemplateLayout::Inline),
            "{{משרה|דרגה צבאית=אלוף}}"
        );
    }

    #[test]
    fn key_value_round_trip_inline() {
        let text = "{{name|a=1|b=2}}";
        let data = get_template_key_value_data(text).expect("parse");
        assert_eq!(
            template_from_key_value_data(&data, "name", TemplateLayout::Inline),
            text
        );
    }

    #[test]
    fn multiline_layout_reparses_to_same_data() {
        let data: NamedParams = [("a", "1"), ("b", "{{x|y}}")].into_iter().collect();
        let text = template_from_key_value_data(&data, "Box", TemplateLayout::default());
        assert_eq!(text, "{{Box\n|a=1\n|b={{x|y}}\n}}");
        assert_eq!(get_template_key_value_data(&text).unwrap(), data);
        assert_eq!(parse_template(&text).unwrap().name, "Box");
    }

    #[test]
    fn numeric_keys_occupy_positional_slots() {
        let data = get_template_data("{{T|a|b|2=c|x=y}}").unwrap();
        assert_eq!(data.positional, vec![Some("a".to_string()), Some("c".to_string())]);
        assert_eq!(data.named.get("x"), Some("y"));
        assert!(!data.named.contains_key("2"));

        let sparse = get_template_data("{{T|3=z}}").unwrap();
        assert_eq!(sparse.positional, vec![None, None, Some("z".to_string())]);
    }

    #[test]
    fn values_are_trimmed_but_keep_inner_newlines() {
        let data = get_template_data("{{T\n| text = line1\nline2\n| k = v }}").unwrap();
        assert_eq!(data.named.get("text"), Some("line1\nline2"));
        assert_eq!(data.named.get("k"), Some("v"));
    }

    #[test]
    fn equals_inside_nested_value_does_not_split() {
        let data = get_template_data("{{T|{{U|k=v}}|[[A|B]]}}").unwrap();
        assert_eq!(
            data.positional,
            vec![Some("{{U|k=v}}".to_string()), Some("[[A|B]]".to_string())]
        );
        assert!(data.named.is_empty());
    }

    #[test]
    fn key_value_data_keys_positionals_by_index() {
        let data = get_template_key_value_data("{{T|first|k=v|second|1=override}}").unwrap();
        let pairs: Vec<(&str, &str)> = data.iter().collect();
        assert_eq!(pairs, vec![("1", "override"), ("k", "v"), ("2", "second")]);
    }

    #[test]
    fn huge_numeric_key_stays_named() {
        let data = get_template_data("{{T|4000000000=x}}").unwrap();
        assert!(data.positional.is_empty());
        assert_eq!(data.named.get("4000000000"), Some("x"));
    }

    #[test]
    fn array_data_modes_and_swap() {
        let text = "{{מפלגה|א|ב|k=v}}";
        let kept = get_template_array_data(text, ArrayMode::KeepNamed).unwrap();
        assert_eq!(
            kept,
            vec![Some("א".to_string()), Some("ב".to_string()), Some("k=v".to_string())]
        );
        let mut positional = get_template_array_data(text, ArrayMode::PositionalOnly).unwrap();
        assert_eq!(positional.len(), 2);
        positional.swap(0, 1);
        assert_eq!(template_from_array_data(&positional, "מפלגה"), "{{מפלגה|ב|א}}");
        assert_eq!(template_from_array_data(&kept, "מפלגה"), text);
    }

    #[test]
    fn array_serialization_edge_cases() {
        let empty: Vec<Option<String>> = Vec::new();
        assert_eq!(template_from_array_data(&empty, "T"), "{{T}}");
        assert_eq!(template_from_array_data(&[None, Some("x")], "T"), "{{T||x}}");
    }

    #[test]
    fn template_data_serialization() {
        let template = parse_template("{{Cite|one|two|title=A|url=http://x}}").unwrap();
        assert_eq!(template.to_wikitext(), "{{Cite|one|two|title=A|url=http://x}}");
        let kv = template.key_value_data();
        assert_eq!(kv.keys().collect::<Vec<_>>(), vec!["1", "2", "title", "url"]);
    }

    #[test]
    fn strict_parse_rejects_non_templates() {
        assert_eq!(parse_template("{{T|a").unwrap_err().kind(), "MalformedMarkup");
        assert_eq!(parse_template("{{A}} {{B}}").unwrap_err().kind(), "MalformedMarkup");
        assert_eq!(parse_template("{{|x}}").unwrap_err().kind(), "MalformedMarkup");
        assert_eq!(parse_template("plain").unwrap_err().kind(), "MalformedMarkup");
    }

    #[test]
    fn accessor_errors() {
        let template = parse_template("{{T|a|3=c}}").unwrap();
        assert_eq!(template.get_positional(0).unwrap(), "a");
        assert_eq!(template.get_positional(1).unwrap_err().kind(), "NotFound");
        assert_eq!(template.get_positional(5).unwrap_err().kind(), "IndexOutOfBounds");
        assert_eq!(template.get_named("missing").unwrap_err().kind(), "NotFound");
    }

    #[test]
    fn all_top_level_templates() {
        let text = "{{A|{{B}}}} text {{C|x}} and {{broken";
        let mut finder = find_all_templates(text);
        let names: Vec<String> = finder.by_ref().map(|t| t.name).collect();
        assert_eq!(names, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(finder.diagnostics().len(), 1);
    }

    #[test]
    fn stray_link_does_not_hide_later_templates() {
        let text = "see [[broken link {{A|x}} and {{B}}";
        let mut finder = find_all_templates_with(text, DiagnosticContext::for_page("Stray"));
        let names: Vec<String> = finder.by_ref().map(|t| t.name).collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
        let diagnostics = finder.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].grammar, Grammar::InternalLink);
        assert_eq!(diagnostics[0].span.start, 4);
        assert_eq!(diagnostics[0].title.as_deref(), Some("Stray"));
    }

    #[test]
    fn unclosed_link_inside_value_does_not_swallow_later_params() {
        let text = "{{T|[[A|b=2}}";
        let mut finder = find_templates(text, "T");
        let template = finder.next().expect("template");
        assert_eq!(template.data.positional, vec![Some("[[A".to_string())]);
        assert_eq!(template.get_named("b").unwrap(), "2");
        assert_eq!(finder.diagnostics().len(), 1);
        assert_eq!(finder.diagnostics()[0].span.start, 4);

        let data = get_template_key_value_data(text).unwrap();
        assert_eq!(data.iter().collect::<Vec<_>>(), vec![("1", "[[A"), ("b", "2")]);
    }

    #[test]
    fn strict_parse_excerpt_follows_context_length() {
        let err = parse_template_with("{{Long|unclosed", DiagnosticContext::default().with_context_chars(6))
            .unwrap_err();
        match err {
            WtError::MalformedMarkup { context, .. } => assert_eq!(context.as_deref(), Some("{{Long")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn named_params_editing() {
        let mut params: NamedParams = [("a", "1"), ("b", "2"), ("c", "")].into_iter().collect();
        assert_eq!(params.insert("a", "10").as_deref(), Some("1"));
        assert!(params.rename("b", "bee"));
        assert!(!params.rename("zzz", "y"));
        params.retain(|_, v| !v.is_empty());
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "10"), ("bee", "2")]);

        // renaming onto an existing key keeps the renamed entry's position
        let mut params: NamedParams = [("old", "x"), ("new", "y")].into_iter().collect();
        assert!(params.rename("old", "new"));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("new", "x")]);
    }

    #[test]
    fn named_params_serialize_in_insertion_order() {
        let params: NamedParams = [("z", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"{"z":"1","a":"2"}"#);
    }
}
