use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use super::{ClientStorage, StorageKey};
use crate::error::{Error, Result};

/// Storage backed by a single JSON document.
///
/// Every write replaces the whole file through a sibling temp file and a
/// rename, so a bulk update or removal lands in one step.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

type Document = BTreeMap<String, String>;

impl FileStorage {
    /// Open storage at `path`. The file and its parent directory are created
    /// on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Document> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Document::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, doc: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(
            name: "storage.file.written",
            path = %self.path.display(),
            entries = doc.len(),
            "Session file written"
        );
        Ok(())
    }

    /// Unparsable content is dropped on write: the next write starts from an
    /// empty document.
    fn update(&self, f: impl FnOnce(&mut Document)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = match self.read() {
            Err(Error::Json(err)) => {
                warn!(
                    name: "storage.file.reset",
                    path = %self.path.display(),
                    error = %err,
                    "Session file unreadable, starting over"
                );
                Document::new()
            }
            other => other?,
        };
        f(&mut doc);
        self.write(&doc)
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: StorageKey) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.remove(key.as_str()))
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<()> {
        self.update(|doc| {
            doc.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        self.update(|doc| {
            doc.remove(key.as_str());
        })
    }

    fn set_all(&self, entries: &[(StorageKey, String)]) -> Result<()> {
        self.update(|doc| {
            for (key, value) in entries {
                doc.insert(key.as_str().to_string(), value.clone());
            }
        })
    }

    fn remove_all(&self, keys: &[StorageKey]) -> Result<()> {
        self.update(|doc| {
            for key in keys {
                doc.remove(key.as_str());
            }
        })
    }
}
