//! Runtime settings for the binary and batch runs.
//!
//! Values come from the environment (a `.env` file is loaded by `main`
//! first). An unusable value is logged and the default kept.

use derive_builder::Builder;

use crate::wikitext::diagnostics::DEFAULT_CONTEXT_CHARS;
use crate::wikitext::errors::{Result, WtError};

pub const CONTEXT_CHARS_VAR: &str = "WIKI_SCANNER_CONTEXT_CHARS";
pub const MAX_CONCURRENT_VAR: &str = "WIKI_SCANNER_MAX_CONCURRENT";
pub const SUMMARY_VAR: &str = "WIKI_SCANNER_SUMMARY";

pub const DEFAULT_MAX_CONCURRENT: usize = 8;
pub const DEFAULT_SUMMARY: &str = "Automated template maintenance";

#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), default, build_fn(validate = "Self::validate"))]
pub struct Config {
    /// Characters of context kept in markup diagnostics.
    pub context_chars: usize,
    /// Pages processed at the same time by `run_batch`.
    pub max_concurrent: usize,
    /// Edit summary handed to the page store.
    pub summary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            summary: DEFAULT_SUMMARY.to_string(),
        }
    }
}

impl ConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.max_concurrent == Some(0) {
            return Err("max_concurrent must be at least 1".to_string());
        }
        Ok(())
    }
}

fn parse_count<F>(lookup: &F, var: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var)?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            log::warn!("Ignoring {}={:?}: expected a positive integer", var, raw);
            None
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigBuilder::default();
        if let Some(n) = parse_count(&lookup, CONTEXT_CHARS_VAR) {
            builder.context_chars(n);
        }
        if let Some(n) = parse_count(&lookup, MAX_CONCURRENT_VAR) {
            builder.max_concurrent(n);
        }
        if let Some(summary) = lookup(SUMMARY_VAR).filter(|s| !s.trim().is_empty()) {
            builder.summary(summary);
        }
        let config = builder
            .build()
            .map_err(|e| WtError::other_with_source("invalid configuration", Some(e)))?;
        log::debug!("{:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup_in(&[])).expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.context_chars, 100);
        assert_eq!(config.max_concurrent, 8);
    }

    #[test]
    fn reads_values() {
        let config = Config::from_lookup(lookup_in(&[
            (CONTEXT_CHARS_VAR, "40"),
            (MAX_CONCURRENT_VAR, " 3 "),
            (SUMMARY_VAR, "בוט: הסרת פרמטר"),
        ]))
        .expect("config");
        assert_eq!(config.context_chars, 40);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.summary, "בוט: הסרת פרמטר");
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = Config::from_lookup(lookup_in(&[
            (CONTEXT_CHARS_VAR, "lots"),
            (MAX_CONCURRENT_VAR, "0"),
        ]))
        .expect("config");
        assert_eq!(config.context_chars, DEFAULT_CONTEXT_CHARS);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        let err = ConfigBuilder::default().max_concurrent(0usize).build();
        assert!(err.is_err());
        let ok = ConfigBuilder::default()
            .summary("s")
            .build()
            .expect("config");
        assert_eq!(ok.summary, "s");
        assert_eq!(ok.max_concurrent, DEFAULT_MAX_CONCURRENT);
    }
}
