//! Directory-backed store: one `<key>.json` file per key.
//!
//! # Invariants
//! - Writes go through a sibling temp file and a rename, so readers never see
//!   a half-written document.
//! - A missing file reads as "no entry", not as an error.

use super::{BackingStore, StoreError, StoreResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            store: self.name().to_string(),
            source,
        }
    }
}

impl BackingStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn is_available(&self) -> bool {
        !self.dir.as_os_str().is_empty()
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|err| self.io_error(err))?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &target).map_err(|err| self.io_error(err))
    }
}
