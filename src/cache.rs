use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{MetadataError, Result};
use crate::pipeline::{self, BatchResult};

/// File identity used to decide whether a cached value is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: SystemTime,
    len: u64,
}

impl Stamp {
    fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MetadataError::NotFound(path.to_path_buf()),
            _ => MetadataError::Io(e),
        })?;
        Ok(Self {
            modified: meta.modified()?,
            len: meta.len(),
        })
    }
}

/// Cache key for `path`: the canonical parent directory joined with the file
/// name. The file itself is not resolved, so a symlinked image stays keyed
/// under the folder it was listed in.
fn key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            match fs::canonicalize(parent) {
                Ok(dir) => dir.join(name),
                Err(_) => path.to_path_buf(),
            }
        }
        _ => path.to_path_buf(),
    }
}

#[derive(Debug)]
struct Entry {
    stamp: Stamp,
    text: String,
}

/// Metadata cache keyed by path, modification time and size.
///
/// Long-running callers (an editor browsing a folder) can hold one of these
/// instead of re-parsing every file on each request. Writes made through the
/// cache invalidate the affected entries; a changed mtime or size on disk
/// causes a re-read.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<PathBuf, Entry>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached parameters text for `path`, re-reading if the file changed.
    pub fn get(&mut self, path: &Path) -> Result<String> {
        let stamp = Stamp::of(path)?;
        let key = key(path);
        if let Some(entry) = self.entries.get(&key) {
            if entry.stamp == stamp {
                log::trace!("Cache hit: {}", path.display());
                return Ok(entry.text.clone());
            }
        }

        let text = pipeline::read_metadata(path)?;
        self.entries.insert(
            key,
            Entry {
                stamp,
                text: text.clone(),
            },
        );
        Ok(text)
    }

    /// Write through to disk and drop the cached entry.
    pub fn write(&mut self, path: &Path, text: &str, make_backup: bool) -> Result<()> {
        self.invalidate(path);
        pipeline::write_metadata(path, text, make_backup)
    }

    /// Run a batch replace and drop every entry under `folder`, however the
    /// folder path is spelled.
    pub fn batch_replace(
        &mut self,
        folder: &Path,
        find: &str,
        replace: &str,
        make_backup: bool,
    ) -> Result<BatchResult> {
        let result = pipeline::batch_replace(folder, find, replace, make_backup);
        let folder = fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
        self.entries.retain(|p, _| !p.starts_with(&folder));
        result
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(&key(path));
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
