//! Wikitext module root
//!
//! Declares the scanner, the three construct engines under `types`, and the
//! `WikiText` page wrapper, and re-exports the items most callers need.

pub mod diagnostics;
pub mod enums;
pub mod errors;
pub mod scanner;
pub mod span;
pub mod types;
pub mod wiki_text;

pub use diagnostics::{DiagnosticContext, Malformed};
pub use enums::{Grammar, LinkType};
pub use errors::{Result, WtError};
pub use scanner::{ScanOptions, find_matching_close, find_unshadowed};
pub use span::MarkupSpan;
pub use types::links::{ExternalLink, InnerLink, Link, get_external_links, get_inner_links};
pub use types::table::{Table, TableRow, build_table, build_table_row, build_table_with_style, parse_tables};
pub use types::templates::{
    ArrayMode, NamedParams, Template, TemplateData, TemplateLayout, find_templates,
    get_template_data, get_template_key_value_data, template_from_array_data,
    template_from_key_value_data,
};
pub use wiki_text::WikiText;
