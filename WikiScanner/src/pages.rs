//! Where page markup comes from and where edits go.
//!
//! The engines never talk to a wiki; a `PageStore` hands them markup by title
//! and takes the edited markup back. `MemoryPages` keeps everything in a map,
//! `FilePages` treats each file as one page titled by its path.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::wikitext::errors::{Result, WtError};

pub trait PageStore: Send + Sync {
    /// Titles of every page in the store, in a stable order.
    fn titles(&self) -> Result<Vec<String>>;

    fn fetch_markup(&self, title: &str) -> Result<String>;

    fn submit_markup(&self, title: &str, markup: &str, summary: &str) -> Result<()>;
}

/// A recorded `submit_markup` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub title: String,
    pub summary: String,
}

/// In-memory pages; keeps a log of submitted edits.
#[derive(Debug, Default)]
pub struct MemoryPages {
    pages: Mutex<BTreeMap<String, String>>,
    edits: Mutex<Vec<Edit>>,
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> WtError {
    WtError::other_with_source::<std::io::Error>("page store lock poisoned", None)
}

impl MemoryPages {
    pub fn new<I, T, M>(pages: I) -> Self
    where
        I: IntoIterator<Item = (T, M)>,
        T: Into<String>,
        M: Into<String>,
    {
        Self {
            pages: Mutex::new(
                pages
                    .into_iter()
                    .map(|(t, m)| (t.into(), m.into()))
                    .collect(),
            ),
            edits: Mutex::new(Vec::new()),
        }
    }

    pub fn edits(&self) -> Result<Vec<Edit>> {
        Ok(self.edits.lock().map_err(poisoned)?.clone())
    }
}

impl PageStore for MemoryPages {
    fn titles(&self) -> Result<Vec<String>> {
        Ok(self.pages.lock().map_err(poisoned)?.keys().cloned().collect())
    }

    fn fetch_markup(&self, title: &str) -> Result<String> {
        self.pages
            .lock()
            .map_err(poisoned)?
            .get(title)
            .cloned()
            .ok_or_else(|| WtError::not_found(format!("page '{}'", title)))
    }

    fn submit_markup(&self, title: &str, markup: &str, summary: &str) -> Result<()> {
        self.pages
            .lock()
            .map_err(poisoned)?
            .insert(title.to_string(), markup.to_string());
        self.edits.lock().map_err(poisoned)?.push(Edit {
            title: title.to_string(),
            summary: summary.to_string(),
        });
        Ok(())
    }
}

/// Pages stored as files, one page per path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePages {
    files: Vec<PathBuf>,
}

impl FilePages {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    fn path_of(&self, title: &str) -> Result<&PathBuf> {
        self.files
            .iter()
            .find(|p| p.to_string_lossy() == title)
            .ok_or_else(|| WtError::not_found(format!("file page '{}'", title)))
    }
}

impl PageStore for FilePages {
    fn titles(&self) -> Result<Vec<String>> {
        Ok(self
            .files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    fn fetch_markup(&self, title: &str) -> Result<String> {
        let path = self.path_of(title)?;
        fs::read_to_string(path).map_err(|e| WtError::io_err(format!("reading {:?}", path), e))
    }

    fn submit_markup(&self, title: &str, markup: &str, summary: &str) -> Result<()> {
        let path = self.path_of(title)?;
        fs::write(path, markup).map_err(|e| WtError::io_err(format!("writing {:?}", path), e))?;
        log::info!("Edit page: {} ({})", title, summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pages_round_trip() {
        let store = MemoryPages::new([("B", "{{T}}"), ("A", "text")]);
        assert_eq!(store.titles().unwrap(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(store.fetch_markup("B").unwrap(), "{{T}}");
        assert_eq!(store.fetch_markup("C").unwrap_err().kind(), "NotFound");

        store.submit_markup("A", "new", "summary").unwrap();
        assert_eq!(store.fetch_markup("A").unwrap(), "new");
        assert_eq!(
            store.edits().unwrap(),
            vec![Edit {
                title: "A".to_string(),
                summary: "summary".to_string()
            }]
        );
    }

    #[test]
    fn file_pages_read_and_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.wiki");
        fs::write(&path, "{{T|a=1}}").expect("seed file");

        let store = FilePages::new([path.clone()]);
        let titles = store.titles().unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(store.fetch_markup(&titles[0]).unwrap(), "{{T|a=1}}");

        store.submit_markup(&titles[0], "{{T}}", "s").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{{T}}");
        assert_eq!(store.fetch_markup("elsewhere").unwrap_err().kind(), "NotFound");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.wiki");
        let store = FilePages::new([path.clone()]);
        let err = store
            .fetch_markup(&path.to_string_lossy())
            .unwrap_err();
        assert_eq!(err.kind(), "Io");
    }
}
