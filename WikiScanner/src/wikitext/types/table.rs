/*
types/table.rs

Table blocks: finding `{| ... |}`, splitting them into rows and cells, and
building table markup from row data.

Rows are separated by top-level `\n|-`; the rest of a `|-` line holds the
row's attributes. Cells are separated by `||` or a new line starting with `|`
(`!!` / `\n!` for header rows). A nested table sits inside a cell verbatim.
*/

use itertools::Itertools;
use serde::Serialize;

use crate::wikitext::diagnostics::{DiagnosticContext, Diagnostics, Malformed};
use crate::wikitext::enums::Grammar;
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::scanner::{ScanOptions, find_first_recovering, find_matching_close};
use crate::wikitext::span::MarkupSpan;

/// Written in place of a missing field by the row builders.
pub const MISSING_FIELD_PLACEHOLDER: &str = "---";

/// The row builders remove line breaks from field values, since a newline
/// followed by `|` would start a new cell. Lossy for multi-line cells.
///
/// `Table::to_wikitext` keeps them: a parsed field never holds a top-level
/// `\n|`, so writing it back as is cannot split it.
pub const STRIP_FIELD_NEWLINES: bool = true;

/// One table row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// Row attributes (from the `|-` line) or the inline attributes before a
    /// single `|` on the first cell. Empty when there are none.
    pub style: String,
    pub is_header: bool,
    pub fields: Vec<String>,
}

/// A parsed table block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Attributes after `{|`, e.g. `class="wikitable"`.
    pub style: String,
    pub caption: Option<String>,
    pub rows: Vec<TableRow>,
    pub span: MarkupSpan,
}

impl Table {
    pub fn raw<'t>(&self, source: &'t str) -> &'t str {
        self.span.slice(source)
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| !r.is_header)
    }

    /// Rebuild the table markup. Every row gets an explicit `|-` line
    /// carrying its style and fields are written unchanged, so parsing the
    /// result gives back the same rows.
    pub fn to_wikitext(&self) -> String {
        let mut out = String::from("{|");
        if !self.style.is_empty() {
            out.push(' ');
            out.push_str(&self.style);
        }
        if let Some(caption) = &self.caption {
            out.push_str("\n|+ ");
            out.push_str(caption);
        }
        for row in &self.rows {
            push_row(
                &mut out,
                row.fields.iter().map(|f| Some(f.as_str())),
                Some(&row.style),
                row.is_header,
                false,
            );
        }
        out.push_str("\n|}");
        out
    }
}

fn render_field(field: Option<&str>, strip_newlines: bool) -> String {
    match field {
        None => MISSING_FIELD_PLACEHOLDER.to_string(),
        Some(value) if strip_newlines => value.replace(['\r', '\n'], "").trim().to_string(),
        Some(value) => value.trim().to_string(),
    }
}

fn push_row<'a, I>(out: &mut String, fields: I, style: Option<&str>, is_header: bool, strip_newlines: bool)
where
    I: Iterator<Item = Option<&'a str>>,
{
    out.push_str("\n|-");
    if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty()) {
        out.push(' ');
        out.push_str(style);
    }
    out.push('\n');
    out.push(if is_header { '!' } else { '|' });
    let separator = if is_header { " !! " } else { " || " };
    out.push_str(&fields.map(|f| render_field(f, strip_newlines)).join(separator));
}

/// Markup for one row: `\n|-[ style]\n|a || b` (`!a !! b` for headers).
///
/// `None` fields are written as `MISSING_FIELD_PLACEHOLDER`.
pub fn build_table_row<S: AsRef<str>>(fields: &[Option<S>], style: Option<&str>, is_header: bool) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        fields.iter().map(|f| f.as_ref().map(|s| s.as_ref())),
        style,
        is_header,
        STRIP_FIELD_NEWLINES,
    );
    out
}

fn table_head<H: AsRef<str>>(headers: &[H], sortable: bool) -> String {
    format!(
        "{{| class=\"wikitable{}\"\n! {}",
        if sortable { " sortable" } else { "" },
        headers.iter().map(|h| h.as_ref()).join(" !! ")
    )
}

/// A complete `wikitable` with one header row and plain data rows.
pub fn build_table<H, S>(headers: &[H], rows: &[Vec<Option<S>>], sortable: bool) -> String
where
    H: AsRef<str>,
    S: AsRef<str>,
{
    let mut out = table_head(headers, sortable);
    for row in rows {
        out.push_str(&build_table_row(row, None, false));
    }
    out.push_str("\n|}");
    out
}

/// Like `build_table`, keeping each row's style and header flag.
pub fn build_table_with_style<H: AsRef<str>>(headers: &[H], rows: &[TableRow], sortable: bool) -> String {
    let mut out = table_head(headers, sortable);
    for row in rows {
        push_row(
            &mut out,
            row.fields.iter().map(|f| Some(f.as_str())),
            Some(&row.style),
            row.is_header,
            STRIP_FIELD_NEWLINES,
        );
    }
    out.push_str("\n|}");
    out
}

/// Scans inside one table. Links or templates left open there are reported
/// against the page the table came from.
struct Splitter<'s, 'd, 'c> {
    source: &'s str,
    diagnostics: &'d mut Diagnostics<'c>,
}

impl Splitter<'_, '_, '_> {
    /// First unshadowed target in `text`, which starts at byte `base` of the
    /// page.
    fn find_first(&mut self, text: &str, base: usize, from: usize, targets: &[&str]) -> Option<(usize, usize)> {
        let source = self.source;
        let diagnostics = &mut *self.diagnostics;
        find_first_recovering(text, from, targets, ScanOptions::default(), |grammar, at| {
            diagnostics.report(source, grammar, base + at)
        })
    }

    fn find(&mut self, text: &str, base: usize, from: usize, target: &str) -> Option<usize> {
        self.find_first(text, base, from, &[target]).map(|(at, _)| at)
    }

    fn split_row(&mut self, text: &str, base: usize, is_header: bool, style: String) -> TableRow {
        let (delim, boundaries) = if is_header {
            ("!", ["!!", "\n!"])
        } else {
            ("|", ["||", "\n|"])
        };

        let mut cur = usize::from(text.starts_with(delim));
        let mut style = style;
        if style.is_empty()
            && let Some(sep) = self.find(text, base, cur, delim)
        {
            let boundary = self.find_first(text, base, cur, &boundaries).map(|(at, _)| at);
            let attrs = &text[cur..sep];
            if boundary.is_none_or(|b| sep < b)
                && !attrs.contains('\n')
                && !text[sep + 1..].starts_with(delim)
            {
                style = attrs.trim().to_string();
                cur = sep + 1;
            }
        }

        let mut fields = Vec::new();
        while let Some((at, _)) = self.find_first(text, base, cur, &boundaries) {
            fields.push(text[cur..at].trim().to_string());
            cur = at + 2;
        }
        fields.push(text[cur..].trim().to_string());

        TableRow {
            style,
            is_header,
            fields,
        }
    }

    /// One chunk between row separators, starting at byte `base` of the page.
    /// A chunk that follows a `|-` starts with the rest of that line, the row
    /// attributes.
    fn parse_chunk(&mut self, chunk: &str, base: usize, after_separator: bool) -> Option<TableRow> {
        let (attrs, cells_at) = if after_separator {
            match chunk.find('\n') {
                Some(nl) => (chunk[..nl].trim(), nl + 1),
                None => (chunk.trim(), chunk.len()),
            }
        } else {
            ("", 0)
        };
        let rest = &chunk[cells_at..];
        let cells = rest.trim();
        if cells.is_empty() {
            return None;
        }
        let cells_base = base + cells_at + (rest.len() - rest.trim_start().len());
        Some(self.split_row(cells, cells_base, cells.starts_with('!'), attrs.to_string()))
    }

    /// Parse `source[start..end]`, the text between `{|` and the closing `|}`.
    fn parse_body(&mut self, start: usize, end: usize, span: MarkupSpan) -> Table {
        let source = self.source;
        let body = &source[start..end];
        let Some((first, _)) = self.find_first(body, start, 0, &["!", "|"]) else {
            return Table {
                style: body.trim().to_string(),
                caption: None,
                rows: Vec::new(),
                span,
            };
        };
        let style = body[..first].trim().to_string();

        let mut pos = first;
        let mut caption = None;
        if body[pos..].starts_with("|+") {
            let eol = body[pos..].find('\n').map_or(body.len(), |nl| pos + nl);
            caption = Some(body[pos + 2..eol].trim().to_string());
            pos = eol;
        }

        let mut rows = Vec::new();
        let mut after_separator = false;
        if body[pos..].starts_with("|-") {
            pos += 2;
            after_separator = true;
        }
        loop {
            let sep = self.find(body, start, pos, "\n|-");
            let chunk = &body[pos..sep.unwrap_or(body.len())];
            rows.extend(self.parse_chunk(chunk, start + pos, after_separator));
            match sep {
                Some(sep) => {
                    pos = sep + 3;
                    after_separator = true;
                }
                None => break,
            }
        }

        Table {
            style,
            caption,
            rows,
            span,
        }
    }
}

/// Split one row's text into cells.
///
/// `row_text` is the row without its `|-` line. A leading delimiter is
/// skipped. If the first cell is `attrs | text` (`attrs ! text` in a header
/// row: a single delimiter on the first line, before any cell boundary) the
/// attributes become the row style.
pub fn get_table_row(row_text: &str, is_header: bool) -> TableRow {
    let mut diagnostics = Diagnostics::default();
    Splitter {
        source: row_text,
        diagnostics: &mut diagnostics,
    }
    .split_row(row_text, 0, is_header, String::new())
}

fn parse_table_in(source: &str, span: MarkupSpan, diagnostics: &mut Diagnostics<'_>) -> Table {
    Splitter {
        source,
        diagnostics,
    }
    .parse_body(span.start + 2, span.end - 2, span)
}

/// Parse markup that is exactly one table block.
pub fn parse_table(table_text: &str) -> Result<Table> {
    parse_table_with(table_text, DiagnosticContext::default())
}

/// `parse_table`, with `ctx` used for error excerpts and for reporting links
/// or templates left open inside the table.
pub fn parse_table_with(table_text: &str, ctx: DiagnosticContext<'_>) -> Result<Table> {
    let malformed = |msg: &str| WtError::malformed_at(msg, 0, Some(ctx.excerpt(table_text, 0)));
    if !table_text.starts_with("{|") {
        return Err(malformed("table text does not start with '{|'"));
    }
    match find_matching_close(table_text, 2, Grammar::Table) {
        Some(close) if close + 2 == table_text.len() => Ok(parse_table_in(
            table_text,
            MarkupSpan::new(0, table_text.len()),
            &mut Diagnostics::new(ctx),
        )),
        Some(_) => Err(malformed("text continues after the table's closing '|}'")),
        None => Err(malformed("table end not found")),
    }
}

/// Lazy search for table blocks, see `find_tables`.
#[derive(Debug)]
pub struct FindTables<'t, 'c> {
    text: &'t str,
    cursor: usize,
    diagnostics: Diagnostics<'c>,
}

impl FindTables<'_, '_> {
    pub fn diagnostics(&self) -> &[Malformed] {
        self.diagnostics.records()
    }
}

impl Iterator for FindTables<'_, '_> {
    type Item = Table;

    fn next(&mut self) -> Option<Table> {
        while self.cursor < self.text.len() {
            let Some(rel) = self.text[self.cursor..].find("{|") else {
                self.cursor = self.text.len();
                return None;
            };
            let start = self.cursor + rel;
            match find_matching_close(self.text, start + 2, Grammar::Table) {
                Some(close) => {
                    let span = MarkupSpan::new(start, close + 2);
                    self.cursor = span.end;
                    return Some(parse_table_in(self.text, span, &mut self.diagnostics));
                }
                None => {
                    self.diagnostics.report(self.text, Grammar::Table, start);
                    self.cursor = start + 2;
                }
            }
        }
        None
    }
}

/// Every table block in `text`, in order. Nested tables are part of the
/// enclosing table's cells.
pub fn find_tables(text: &str) -> FindTables<'_, 'static> {
    find_tables_with(text, DiagnosticContext::default())
}

pub fn find_tables_with<'t, 'c>(text: &'t str, ctx: DiagnosticContext<'c>) -> FindTables<'t, 'c> {
    FindTables {
        text,
        cursor: 0,
        diagnostics: Diagnostics::new(ctx),
    }
}

/// Find and parse every table in a page.
pub fn parse_tables(text: &str) -> Vec<Table> {
    find_tables(text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "{| class=\"wikitable\"\n! Name !! Count\n|-\n| a || 1\n|-\n| b || 2\n|}";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_style_header_and_rows() {
        let table = parse_table(SIMPLE).expect("table");
        assert_eq!(table.style, "class=\"wikitable\"");
        assert_eq!(table.caption, None);
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0].is_header);
        assert_eq!(table.rows[0].fields, strings(&["Name", "Count"]));
        assert_eq!(table.rows[1].fields, strings(&["a", "1"]));
        assert_eq!(table.rows[2].fields, strings(&["b", "2"]));
        assert_eq!(table.data_rows().count(), 2);
    }

    #[test]
    fn cells_on_separate_lines() {
        let table = parse_table("{|\n|-\n| a\n| b\n|-\n! x\n! y\n|}").expect("table");
        assert_eq!(table.style, "");
        assert_eq!(table.rows[0].fields, strings(&["a", "b"]));
        assert!(table.rows[1].is_header);
        assert_eq!(table.rows[1].fields, strings(&["x", "y"]));
    }

    #[test]
    fn nested_table_stays_inside_cell() {
        let text = "before {| class=x\n|-\n| a || {|\n| inner\n|}\n|-\n| b\n|} after";
        let tables = parse_tables(text);
        assert_eq!(tables.len(), 1);
        let outer = &tables[0];
        assert_eq!(outer.raw(text), &text[7..text.len() - 6]);
        assert_eq!(outer.rows.len(), 2);
        assert_eq!(outer.rows[0].fields, strings(&["a", "{|\n| inner\n|}"]));
        assert_eq!(outer.rows[1].fields, strings(&["b"]));
    }

    #[test]
    fn delimiters_inside_templates_and_links_do_not_split_cells() {
        let table = parse_table("{|\n|-\n| {{T|x||y}} || [[A|B]]\n|}").expect("table");
        assert_eq!(table.rows[0].fields, strings(&["{{T|x||y}}", "[[A|B]]"]));
        assert_eq!(table.rows[0].style, "");
    }

    #[test]
    fn row_styles_from_separator_and_inline() {
        let table = parse_table("{|\n|- style=\"color:red\"\n| a || b\n|-\n| align=right | c\n|}").expect("table");
        assert_eq!(table.rows[0].style, "style=\"color:red\"");
        assert_eq!(table.rows[0].fields, strings(&["a", "b"]));
        assert_eq!(table.rows[1].style, "align=right");
        assert_eq!(table.rows[1].fields, strings(&["c"]));
    }

    #[test]
    fn get_table_row_prefers_earliest_boundary() {
        let row = get_table_row("| a || b\n| c", false);
        assert_eq!(row.fields, strings(&["a", "b", "c"]));
        let header = get_table_row("! x !! y", true);
        assert!(header.is_header);
        assert_eq!(header.fields, strings(&["x", "y"]));
    }

    #[test]
    fn caption_is_kept() {
        let table = parse_table("{| class=x\n|+ Results\n! h\n|-\n| v\n|}").expect("table");
        assert_eq!(table.caption.as_deref(), Some("Results"));
        assert_eq!(table.rows[0].fields, strings(&["h"]));
        assert!(table.rows[0].is_header);
        assert_eq!(table.rows[1].fields, strings(&["v"]));
    }

    #[test]
    fn build_table_markup() {
        let rows = vec![vec![Some("a"), None], vec![Some("multi\nline"), Some(" c ")]];
        let text = build_table(&["H1", "H2"], &rows, true);
        assert_eq!(
            text,
            "{| class=\"wikitable sortable\"\n! H1 !! H2\n|-\n|a || ---\n|-\n|multiline || c\n|}"
        );
        let unsorted = build_table(&["H"], &Vec::<Vec<Option<&str>>>::new(), false);
        assert_eq!(unsorted, "{| class=\"wikitable\"\n! H\n|}");
    }

    #[test]
    fn build_row_with_style_and_header() {
        assert_eq!(
            build_table_row(&[Some("x"), Some("y")], Some("style=\"a\""), false),
            "\n|- style=\"a\"\n|x || y"
        );
        assert_eq!(build_table_row(&[Some("x"), Some("y")], None, true), "\n|-\n!x !! y");
    }

    #[test]
    fn build_with_style_reparses() {
        let rows = vec![
            TableRow {
                style: "class=\"hl\"".to_string(),
                is_header: false,
                fields: strings(&["1", "2"]),
            },
            TableRow {
                style: String::new(),
                is_header: false,
                fields: strings(&["3", "4"]),
            },
        ];
        let text = build_table_with_style(&["A", "B"], &rows, false);
        let table = parse_table(&text).expect("table");
        assert_eq!(table.rows[0].fields, strings(&["A", "B"]));
        assert_eq!(&table.rows[1..], &rows[..]);
    }

    #[test]
    fn serialize_then_reparse_is_idempotent() {
        let source = "{| class=\"wikitable\"\n|+ Cap\n! Name !! Count\n|- style=\"x\"\n| a || 1\n|-\n| align=center | b\n| 2\n|}";
        let first = parse_table(source).expect("table");
        let rebuilt = first.to_wikitext();
        let second = parse_table(&rebuilt).expect("rebuilt table");
        assert_eq!(second.style, first.style);
        assert_eq!(second.caption, first.caption);
        assert_eq!(second.rows, first.rows);
        assert_eq!(second.to_wikitext(), rebuilt);
    }

    #[test]
    fn reserialize_keeps_nested_tables_and_multiline_cells() {
        let nested = parse_table("{|\n|-\n| a || {|\n| inner\n|}\n|}").expect("table");
        let rebuilt = nested.to_wikitext();
        assert_eq!(rebuilt, "{|\n|-\n|a || {|\n| inner\n|}\n|}");
        let reparsed = parse_table(&rebuilt).expect("rebuilt table");
        assert_eq!(reparsed.rows, nested.rows);
        assert_eq!(reparsed.rows[0].fields, strings(&["a", "{|\n| inner\n|}"]));

        let multiline = parse_table("{|\n|-\n| line one\nline two || b\n|}").expect("table");
        assert_eq!(multiline.rows[0].fields, strings(&["line one\nline two", "b"]));
        let reparsed = parse_table(&multiline.to_wikitext()).expect("rebuilt table");
        assert_eq!(reparsed.rows, multiline.rows);
    }

    #[test]
    fn stray_link_in_cell_does_not_hide_later_rows() {
        let text = "{|\n|-\n| [[A || b\n|-\n| c || d\n|}";
        let table = parse_table(text).expect("table");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].fields, strings(&["[[A", "b"]));
        assert_eq!(table.rows[1].fields, strings(&["c", "d"]));

        let mut finder = find_tables_with(text, DiagnosticContext::for_page("T"));
        assert_eq!(finder.next().map(|t| t.rows.len()), Some(2));
        let diagnostics = finder.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].grammar, Grammar::InternalLink);
        assert_eq!(diagnostics[0].span.start, 8);
    }

    #[test]
    fn header_row_inline_style_uses_header_delimiter() {
        let header = get_table_row("! scope=col ! Name", true);
        assert_eq!(header.style, "scope=col");
        assert_eq!(header.fields, strings(&["Name"]));

        let header = get_table_row("! a | b !! c", true);
        assert_eq!(header.style, "");
        assert_eq!(header.fields, strings(&["a | b", "c"]));
    }

    #[test]
    fn strict_parse_excerpt_follows_context_length() {
        let err = parse_table_with("{|\n| never closed", DiagnosticContext::default().with_context_chars(4))
            .unwrap_err();
        match err {
            WtError::MalformedMarkup { context, .. } => assert_eq!(context.as_deref(), Some("{|\n|")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unclosed_table_is_reported_and_skipped() {
        let text = "{| class=x\n| a\n\n{|\n| b\n|}";
        let mut finder = find_tables_with(text, DiagnosticContext::for_page("T"));
        let tables: Vec<Table> = finder.by_ref().collect();
        // the first "{|" swallows the second's close, so only the inner one parses
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0].fields, strings(&["b"]));
        assert_eq!(finder.diagnostics().len(), 1);
        assert_eq!(finder.diagnostics()[0].span.start, 0);
    }

    #[test]
    fn strict_parse_errors() {
        assert_eq!(parse_table("| a |}").unwrap_err().kind(), "MalformedMarkup");
        assert_eq!(parse_table("{|\n| a").unwrap_err().kind(), "MalformedMarkup");
        assert_eq!(parse_table("{|\n|}\n{|\n|}").unwrap_err().kind(), "MalformedMarkup");
    }

    #[test]
    fn empty_table() {
        let table = parse_table("{||}").expect("table");
        assert!(table.rows.is_empty());
        assert_eq!(table.style, "");
    }
}
