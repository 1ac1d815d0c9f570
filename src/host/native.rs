//! Production implementations of the host capabilities.
//!
//! These are what a host uses when it has no environment of its own to
//! bridge: [`ReqwestFetch`] over a shared `reqwest` client,
//! [`NativeFileSystem`] over `tokio::fs` (with a `walkdir` listing),
//! [`ZipExtractor`] over the `zip` crate, and [`JsonFileStore`], which keeps
//! one JSON file per key under a directory the host picks.
//!
//! Blocking work (zip extraction, directory walking) runs on the blocking
//! thread pool via `spawn_blocking`, so none of these block the async
//! runtime.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::task;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::UpdateError;
use crate::host::{ArchiveExtractor, FileSystem, HttpFetch, HttpResponse, KeyValueStore};

/// HTTP fetch capability backed by a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Create a fetcher with a fresh client and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher around an existing client (shared pools, custom
    /// timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpFetch for ReqwestFetch {
    type Response = ReqwestResponse;

    async fn get(&self, url: &str) -> Result<Self::Response, UpdateError> {
        debug!("GET {url}");
        let inner = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| UpdateError::Fetch {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(ReqwestResponse { inner })
    }
}

/// Response wrapper produced by [`ReqwestFetch`].
#[derive(Debug)]
pub struct ReqwestResponse {
    inner: reqwest::Response,
}

impl HttpResponse for ReqwestResponse {
    fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    fn status_text(&self) -> &str {
        self.inner.status().canonical_reason().unwrap_or("")
    }

    async fn bytes(self) -> Result<Vec<u8>, UpdateError> {
        let body = self
            .inner
            .bytes()
            .await
            .map_err(|err| UpdateError::Conversion {
                reason: err.to_string(),
            })?;
        Ok(body.to_vec())
    }
}

/// File-system capability over `tokio::fs`.
///
/// The recursive listing delegates to `walkdir` on the blocking pool and
/// returns files only, sorted by name, so callers get a stable order for
/// logging and verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileSystem;

impl NativeFileSystem {
    /// Create the capability. Stateless; `Default` works too.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), UpdateError> {
        Ok(fs::create_dir_all(path).await?)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), UpdateError> {
        Ok(fs::write(path, contents).await?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), UpdateError> {
        Ok(fs::rename(from, to).await?)
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), UpdateError> {
        Ok(fs::remove_dir_all(path).await?)
    }

    async fn remove_file(&self, path: &Path) -> Result<(), UpdateError> {
        Ok(fs::remove_file(path).await?)
    }

    async fn list_recursive(&self, dir: &Path) -> Result<Vec<PathBuf>, UpdateError> {
        let root = dir.to_path_buf();
        let listing = task::spawn_blocking(move || -> Result<Vec<PathBuf>, io::Error> {
            let mut files = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Ok(files)
        })
        .await
        .map_err(|err| UpdateError::Io(io::Error::other(err)))?;
        Ok(listing?)
    }
}

/// Archive extraction via the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Create the capability. Stateless; `Default` works too.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveExtractor for ZipExtractor {
    async fn unzip(&self, archive: &Path, dest: &Path) -> Result<(), UpdateError> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        task::spawn_blocking(move || -> Result<(), UpdateError> {
            let file = std::fs::File::open(&archive)?;
            let mut zip =
                zip::ZipArchive::new(file).map_err(|err| UpdateError::Extract {
                    path: archive.display().to_string(),
                    reason: err.to_string(),
                })?;
            zip.extract(&dest).map_err(|err| UpdateError::Extract {
                path: archive.display().to_string(),
                reason: err.to_string(),
            })
        })
        .await
        .map_err(|err| UpdateError::Io(io::Error::other(err)))?
    }
}

/// Key-value store persisting one JSON file per key.
///
/// Keys become `<dir>/<key>.json`, so keys must be plain file-name-safe
/// strings; the engine's cache keys (`"<script name>.update-check"`) are.
/// Reads treat a missing file as an absent key; any other read or write
/// failure is logged at warn level and reported as absent/`false`, matching
/// the best-effort contract of [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path).await {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> bool {
        if let Err(err) = fs::create_dir_all(&self.dir).await {
            warn!("failed to create store directory {}: {err}", self.dir.display());
            return false;
        }
        let path = self.entry_path(key);
        match fs::write(&path, value).await {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to write {}: {err}", path.display());
                false
            }
        }
    }
}
