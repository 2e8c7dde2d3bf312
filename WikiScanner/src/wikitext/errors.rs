//! Error types for the wikitext module.
//!
//! Finders never fail: a construct that is not there is reported as `None`,
//! and a construct that is opened but never closed is skipped with a logged
//! diagnostic (see `diagnostics`). `WtError` is for the strict entry points
//! (parsing one template on its own), for typed accessors that ask for a
//! parameter that is not present, and for the page I/O around the engines.
//!
//! Exported items:
//! - `WtError` - main error enum.
//! - `Result<T>` - convenient alias `std::result::Result<T, WtError>`.

use std::error::Error;
use std::fmt;

/// The canonical result type used across the wikitext module.
pub type Result<T> = std::result::Result<T, WtError>;

/// Wikitext error with rich variants.
///
/// - `MalformedMarkup` - an opening token without its closing token, or text
///   that is not the construct the caller claimed it was. Carries the byte
///   offset (if known) and a short excerpt of the surrounding text.
/// - `NotFound` - requested item was not present (templates/parameters).
/// - `IndexOutOfBounds` - asked for the Nth element but the collection was
///   smaller; contains both the requested index and the available length.
/// - `InvalidArgument` - caller supplied something unusable (empty name...).
/// - `Io` - wrapper for page store I/O errors.
/// - `Other` - catch-all carrying a message and optional boxed cause.
#[derive(Debug)]
pub enum WtError {
    MalformedMarkup {
        msg: String,
        /// Byte offset in the source where the problem was detected, if known.
        offset: Option<usize>,
        context: Option<String>,
    },
    NotFound {
        msg: String,
    },
    IndexOutOfBounds {
        idx: usize,
        len: usize,
    },
    InvalidArgument {
        msg: String,
    },
    Io {
        msg: String,
        source: Option<Box<dyn Error + Send + Sync + 'static>>,
    },
    Other {
        msg: String,
        source: Option<Box<dyn Error + Send + Sync + 'static>>,
    },
}

impl WtError {
    /// Construct a malformed-markup error with a message, offset and excerpt.
    pub fn malformed_at<S: Into<String>>(msg: S, offset: usize, context: Option<String>) -> Self {
        WtError::MalformedMarkup {
            msg: msg.into(),
            offset: Some(offset),
            context,
        }
    }

    /// Construct a not-found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        WtError::NotFound { msg: msg.into() }
    }

    /// Construct an index-out-of-bounds error.
    pub fn index_oob(idx: usize, len: usize) -> Self {
        WtError::IndexOutOfBounds { idx, len }
    }

    /// Construct an invalid argument error.
    pub fn invalid_arg<S: Into<String>>(msg: S) -> Self {
        WtError::InvalidArgument { msg: msg.into() }
    }

    /// Wrap a std::io::Error or other error as an Io variant.
    pub fn io_err<E: Error + Send + Sync + 'static>(msg: impl Into<String>, e: E) -> Self {
        WtError::Io {
            msg: msg.into(),
            source: Some(Box::new(e)),
        }
    }

    /// Generic helper to produce Other(...) with an optional source.
    pub fn other_with_source<E: Error + Send + Sync + 'static>(
        msg: impl Into<String>,
        source: Option<E>,
    ) -> Self {
        WtError::Other {
            msg: msg.into(),
            source: source.map(|e| Box::new(e) as Box<dyn Error + Send + Sync>),
        }
    }

    /// Returns a short description of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WtError::MalformedMarkup { .. } => "MalformedMarkup",
            WtError::NotFound { .. } => "NotFound",
            WtError::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            WtError::InvalidArgument { .. } => "InvalidArgument",
            WtError::Io { .. } => "Io",
            WtError::Other { .. } => "Other",
        }
    }

    fn source_opt(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WtError::Io { source, .. } | WtError::Other { source, .. } => {
                source.as_ref().map(|b| b.as_ref() as &dyn Error)
            }
            _ => None,
        }
    }
}

impl fmt::Display for WtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WtError::MalformedMarkup {
                msg,
                offset,
                context,
            } => {
                match offset {
                    Some(off) => write!(f, "Malformed markup at {}: {}", off, msg)?,
                    None => write!(f, "Malformed markup: {}", msg)?,
                }
                if let Some(ctx) = context {
                    write!(f, " (near {:?})", ctx)?;
                }
                Ok(())
            }
            WtError::NotFound { msg } => write!(f, "Not found: {}", msg),
            WtError::IndexOutOfBounds { idx, len } => {
                write!(f, "Index out of bounds: requested {}, length {}", idx, len)
            }
            WtError::InvalidArgument { msg } => write!(f, "Invalid argument: {}", msg),
            WtError::Io { msg, source } => {
                if let Some(s) = source {
                    write!(f, "IO error: {} (cause: {})", msg, s)
                } else {
                    write!(f, "IO error: {}", msg)
                }
            }
            WtError::Other { msg, source } => {
                if let Some(s) = source {
                    write!(f, "{} (cause: {})", msg, s)
                } else {
                    write!(f, "{}", msg)
                }
            }
        }
    }
}

impl Error for WtError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source_opt()
    }
}

impl From<std::io::Error> for WtError {
    fn from(e: std::io::Error) -> Self {
        WtError::io_err("I/O error", e)
    }
}

impl From<serde_json::Error> for WtError {
    fn from(e: serde_json::Error) -> Self {
        WtError::other_with_source("json serialization error", Some(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_malformed_with_offset_and_context() {
        let e = WtError::malformed_at("unclosed template", 123, Some("{{Infobox|".into()));
        let s = format!("{}", e);
        assert!(s.contains("123"));
        assert!(s.contains("unclosed template"));
        assert!(s.contains("{{Infobox|"));
        assert_eq!(e.kind(), "MalformedMarkup");
    }

    #[test]
    fn display_not_found() {
        let e = WtError::not_found("parameter 'x' missing");
        assert!(format!("{}", e).contains("parameter 'x' missing"));
    }

    #[test]
    fn io_conversion_has_source() {
        let io_err = std::io::Error::other("oh no");
        let e: WtError = io_err.into();
        let s = format!("{}", e);
        assert!(s.contains("I/O error"));
        assert!(s.contains("oh no"));
        assert!(e.source().is_some());
    }
}
