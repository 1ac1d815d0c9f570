//! Host capability seam.
//!
//! The update engine never touches the network, the file system, persisted
//! key-value storage, or archive handling directly. Each of those concerns is
//! a trait defined here, supplied by the embedding application when it
//! constructs a checker or installer. This keeps the engine testable (the
//! `test_utils` module provides scripted in-memory implementations) and lets
//! hosts with unusual environments substitute their own primitives.
//!
//! Production implementations backed by `reqwest`, `tokio::fs`, `zip`, and a
//! JSON-file store live in [`native`].
//!
//! # Capabilities
//!
//! - [`KeyValueStore`] - persisted string storage for the update-check cache
//! - [`HttpFetch`] / [`HttpResponse`] - plain GET requests with status and
//!   body access
//! - [`FileSystem`] - the handful of directory/file operations the installer
//!   needs
//! - [`ArchiveExtractor`] - unpacking a downloaded archive into a directory
//! - [`ScriptIdentity`] - who the managed script is and where it lives
//!
//! All I/O methods are `async`; the engine performs no blocking work on the
//! caller's task. Implementations are free to delegate to blocking APIs via
//! `spawn_blocking`, as the native ones do.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::core::UpdateError;

pub mod native;

/// Persisted key-value storage scoped to the host application.
///
/// Used by [`UpdateCache`](crate::update::UpdateCache) to persist the
/// update-check record between runs. Values are opaque strings (the cache
/// stores JSON). Both operations are infallible at the type level: a missing
/// key is `None`, and a failed write is `false`. The cache is an
/// optimization, so the engine treats storage loss as a degraded mode rather
/// than an error.
pub trait KeyValueStore {
    /// Read the value stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, returning whether the write succeeded.
    async fn set(&self, key: &str, value: &str) -> bool;
}

/// A fetched HTTP response: status line plus a one-shot body.
///
/// Mirrors what the engine needs from a response and nothing more. The body
/// accessors consume the response because the underlying transport may
/// stream it.
pub trait HttpResponse: Sized {
    /// Numeric HTTP status code.
    fn status(&self) -> u16;

    /// Reason phrase for the status, or an empty string if unknown.
    fn status_text(&self) -> &str;

    /// Whether the status is in the 2xx success range.
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status())
    }

    /// Materialize the response body as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Conversion`] when the body cannot be buffered.
    async fn bytes(self) -> Result<Vec<u8>, UpdateError>;

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Conversion`] when the body cannot be buffered
    /// or does not parse as `T`.
    async fn json<T: DeserializeOwned>(self) -> Result<T, UpdateError> {
        let raw = self.bytes().await?;
        serde_json::from_slice(&raw).map_err(|err| UpdateError::Conversion {
            reason: err.to_string(),
        })
    }
}

/// Plain HTTP GET capability.
///
/// The engine issues unauthenticated GETs with default headers; anything
/// fancier (auth, retries, timeouts) belongs to the implementation.
pub trait HttpFetch {
    /// The response type this fetcher produces.
    type Response: HttpResponse;

    /// Issue a GET request to `url`.
    ///
    /// Implementations return `Ok` for any response that arrived, regardless
    /// of status; callers decide what a non-success status means in their
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Fetch`] when the request could not be sent or
    /// no response arrived.
    async fn get(&self, url: &str) -> Result<Self::Response, UpdateError>;
}

/// The file-system operations the installer needs, and no more.
///
/// Paths are always absolute from the engine's point of view; they are
/// derived from [`ScriptIdentity::dir`]. `rename` is expected to have move
/// semantics within one filesystem, which the engine guarantees by keeping
/// every derived path a sibling of the live directory.
pub trait FileSystem {
    /// Whether anything exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> Result<(), UpdateError>;

    /// Write `contents` to the file at `path`, replacing it if present.
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), UpdateError>;

    /// Rename/move `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), UpdateError>;

    /// Remove the directory at `path` and everything beneath it.
    async fn remove_dir_all(&self, path: &Path) -> Result<(), UpdateError>;

    /// Remove the file at `path`.
    async fn remove_file(&self, path: &Path) -> Result<(), UpdateError>;

    /// List every file under `dir`, recursively, in a stable order.
    async fn list_recursive(&self, dir: &Path) -> Result<Vec<PathBuf>, UpdateError>;
}

/// Archive unpacking capability.
///
/// The engine treats the archive format as opaque; any container that yields
/// a directory tree is acceptable. The default implementation handles zip.
pub trait ArchiveExtractor {
    /// Extract the archive at `archive` into the directory `dest`.
    ///
    /// `dest` exists before this is called.
    async fn unzip(&self, archive: &Path, dest: &Path) -> Result<(), UpdateError>;
}

/// Identity of the managed script: a name and a live directory.
///
/// The name namespaces the persisted cache key; the directory is the install
/// location whose siblings hold staging, backup, and the downloaded archive.
///
/// # Examples
///
/// ```rust
/// use evergreen::host::ScriptIdentity;
///
/// let identity = ScriptIdentity::new("night-watch", "/opt/scripts/night-watch");
/// assert_eq!(identity.name, "night-watch");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptIdentity {
    /// Script name, used to namespace the cache key.
    pub name: String,
    /// Directory the live script files occupy.
    pub dir: PathBuf,
}

impl ScriptIdentity {
    /// Create an identity from a name and a live directory path.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }
}
