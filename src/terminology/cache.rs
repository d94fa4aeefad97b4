/*!
 * Terminology source caching.
 *
 * Sources are cached per path and invalidated when the file's modification
 * time or size changes, so edits on disk are picked up on the next lookup.
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;
use parking_lot::RwLock;

use crate::errors::TerminologyError;

use super::loader::{TerminologyLoader, TerminologySource};

/// Modification time and size of a file when it was loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            modified: metadata.modified().ok()?,
            len: metadata.len(),
        })
    }
}

#[derive(Debug, Clone)]
struct CachedSource {
    stamp: Option<FileStamp>,
    source: Arc<TerminologySource>,
}

/// Cache of loaded terminology sources keyed by path and modification time
#[derive(Debug, Default)]
pub struct TerminologyCache {
    entries: RwLock<HashMap<PathBuf, CachedSource>>,
}

impl TerminologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a source, reusing the cached copy while the file is unchanged
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<TerminologySource>, TerminologyError> {
        let path = path.as_ref();
        let stamp = FileStamp::of(path);

        if let Some(cached) = self.entries.read().get(path) {
            if stamp.is_some() && cached.stamp == stamp {
                debug!("Terminology cache hit for {}", path.display());
                return Ok(Arc::clone(&cached.source));
            }
        }

        let source = Arc::new(TerminologyLoader::load(path)?);
        self.entries.write().insert(
            path.to_path_buf(),
            CachedSource {
                stamp,
                source: Arc::clone(&source),
            },
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
