//! Structural scanning and editing of MediaWiki wikitext.
//!
//! `wikitext` holds the depth-aware scanner and the template, table and link
//! engines built on it. `jobs`, `pages` and `batch` are the maintenance layer
//! used by the `wiki_scanner` binary: text-to-text edits, a page store
//! abstraction, and concurrent runs across many pages.

pub mod batch;
pub mod config;
pub mod jobs;
pub mod pages;
pub mod wikitext;
