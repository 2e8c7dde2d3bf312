//! Enums used by the wikitext module.
//!
//! - `Grammar` - the paired-delimiter constructs the scanner tracks.
//! - `LinkType` - distinguishes internal vs external links.
//!
//! Both implement `Display` for log lines; `LinkType` also implements
//! `FromStr` for the `links --type` filter of the binary.

use std::fmt;
use std::str::FromStr;

/// A nesting construct with an opening and a closing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    /// `{{ ... }}`
    Template,
    /// `{| ... |}`
    Table,
    /// `[[ ... ]]`
    InternalLink,
    /// `[ ... ]`, only tracked by the external-link-aware scan.
    ExternalLink,
}

impl Grammar {
    pub const fn open(self) -> &'static str {
        match self {
            Grammar::Template => "{{",
            Grammar::Table => "{|",
            Grammar::InternalLink => "[[",
            Grammar::ExternalLink => "[",
        }
    }

    pub const fn close(self) -> &'static str {
        match self {
            Grammar::Template => "}}",
            Grammar::Table => "|}",
            Grammar::InternalLink => "]]",
            Grammar::ExternalLink => "]",
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::Template => write!(f, "template"),
            Grammar::Table => write!(f, "table"),
            Grammar::InternalLink => write!(f, "internal link"),
            Grammar::ExternalLink => write!(f, "external link"),
        }
    }
}

/// The kind of link encountered in parsed wikitext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// Internal wiki link using `[[...]]`.
    Internal,
    /// External link using `[http://...]` or similar.
    External,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Internal => write!(f, "Internal"),
            LinkType::External => write!(f, "External"),
        }
    }
}

impl FromStr for LinkType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" | "int" | "i" => Ok(LinkType::Internal),
            "external" | "ext" | "e" => Ok(LinkType::External),
            other => Err(format!("unknown LinkType '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_tokens() {
        assert_eq!(Grammar::Template.open(), "{{");
        assert_eq!(Grammar::Table.close(), "|}");
        assert_eq!(Grammar::InternalLink.close(), "]]");
        assert_eq!(Grammar::ExternalLink.open(), "[");
    }

    #[test]
    fn grammar_display() {
        assert_eq!(format!("{}", Grammar::InternalLink), "internal link");
        assert_eq!(format!("{}", Grammar::Table), "table");
    }

    #[test]
    fn linktype_fromstr_and_display() {
        assert_eq!(LinkType::from_str("internal").unwrap(), LinkType::Internal);
        assert_eq!(LinkType::from_str("EXT").unwrap(), LinkType::External);
        assert_eq!(format!("{}", LinkType::External), "External");
    }
}
