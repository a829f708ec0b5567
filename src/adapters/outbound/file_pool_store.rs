//! File Pool Store
//!
//! Implements PoolStore on a local file. Replacement writes a sibling
//! temp file, syncs it and renames it over the target, so readers only
//! ever see a complete document.

use crate::domain::ports::PoolStore;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// File-backed pool store.
#[derive(Debug, Clone)]
pub struct FilePoolStore {
    path: PathBuf,
}

impl FilePoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `dir/.name.tmp` next to the target, so the rename stays on one
    /// filesystem.
    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.path.file_name().unwrap_or_default());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PoolStore for FilePoolStore {
    async fn load(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn replace(&self, bytes: &[u8]) -> io::Result<()> {
        let tmp = self.temp_path();

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &self.path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        result
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
