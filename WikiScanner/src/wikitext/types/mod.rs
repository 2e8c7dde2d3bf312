//! Construct types and their engines.

pub mod links;
pub mod table;
pub mod templates;
