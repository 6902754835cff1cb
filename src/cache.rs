//! On-disk cache of raw pull request search responses keyed by commit hash.
use log::*;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;

use crate::error::Result;

/// Directory name used under the user's cache directory.
pub const DEFAULT_CACHE_DIR_NAME: &str = "find-bzs";

/// Flat directory of `sha-<hash>` files holding search API JSON bodies.
/// Entries never expire.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$XDG_CACHE_HOME/find-bzs` or the platform equivalent.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, sha: &str) -> PathBuf {
        self.dir.join(format!("sha-{sha}"))
    }

    /// Raw cached body for `sha`, or `None` if it was never stored.
    pub async fn get(&self, sha: &str) -> Result<Option<String>> {
        let path = self.entry_path(sha);
        match fs::read_to_string(&path).await {
            Ok(body) => {
                debug!("cache hit for {sha}");
                Ok(Some(body))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Store the raw body for `sha`, creating the cache directory if needed.
    pub async fn put(&self, sha: &str, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.entry_path(sha), body).await?;
        debug!("cached search response for {sha}");
        Ok(())
    }
}
