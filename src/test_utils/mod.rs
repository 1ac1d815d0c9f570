//! Scripted, in-memory implementations of the host capabilities.
//!
//! Everything here exists so the engine's behavior can be pinned down
//! without a network, a real file system, or a wall clock: a seedable
//! [`MemoryStore`], a [`ScriptedFetch`] that replays canned responses and
//! records every request, a [`MemoryFileSystem`] that keeps an ordered log
//! of the mutations asked of it (which is how the install-ordering property
//! is asserted), and a [`StubExtractor`] that "extracts" a canned payload.
//!
//! The mocks are cheaply cloneable and share state across clones, so a test
//! can hand one clone to the component under test and keep another to
//! inspect afterwards.
//!
//! Available to unit tests automatically and to integration tests through
//! the `test-utils` feature.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::core::UpdateError;
use crate::host::{ArchiveExtractor, FileSystem, HttpFetch, HttpResponse, KeyValueStore};

/// Initialize tracing output for a test, honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory [`KeyValueStore`] with an optional write-failure mode.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` report failure without storing anything.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert a value directly, bypassing the capability trait.
    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Read a value directly, bypassing the capability trait.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        true
    }
}

/// A canned HTTP response for [`ScriptedFetch`].
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    status: u16,
    status_text: String,
    body: Vec<u8>,
    poisoned: bool,
}

impl ScriptedResponse {
    /// A 200 response whose body is `value` serialized as JSON.
    pub fn ok_json<T: serde::Serialize>(value: &T) -> Self {
        Self::ok_bytes(serde_json::to_vec(value).expect("scripted body serializes"))
    }

    /// A 200 response with a raw byte body.
    pub fn ok_bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body,
            poisoned: false,
        }
    }

    /// An empty-bodied response with the given status line.
    pub fn with_status(status: u16, status_text: &str) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            body: Vec::new(),
            poisoned: false,
        }
    }

    /// A 200 response whose body fails to materialize, for exercising the
    /// conversion-failure path.
    pub fn poisoned_body() -> Self {
        Self {
            poisoned: true,
            ..Self::ok_bytes(Vec::new())
        }
    }
}

impl HttpResponse for ScriptedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    async fn bytes(self) -> Result<Vec<u8>, UpdateError> {
        if self.poisoned {
            return Err(UpdateError::Conversion {
                reason: "scripted body conversion failure".to_string(),
            });
        }
        Ok(self.body)
    }
}

/// [`HttpFetch`] that replays canned responses keyed by URL and records
/// every request made through it.
#[derive(Clone, Default)]
pub struct ScriptedFetch {
    responses: Arc<Mutex<HashMap<String, ScriptedResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetch {
    /// Create a fetcher with no scripted responses; any request fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for `url`.
    pub fn respond(&self, url: &str, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpFetch for ScriptedFetch {
    type Response = ScriptedResponse;

    async fn get(&self, url: &str) -> Result<Self::Response, UpdateError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| UpdateError::Fetch {
                url: url.to_string(),
                reason: "no scripted response for url".to_string(),
            })
    }
}

/// One mutation requested of a [`MemoryFileSystem`], in request order.
///
/// The log records *attempts*, including ones that then fail, so tests can
/// assert both what happened and in which order it was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    /// `create_dir_all(path)`
    CreateDirAll(PathBuf),
    /// `write(path, ..)`
    Write(PathBuf),
    /// `rename(from, to)`
    Rename(PathBuf, PathBuf),
    /// `remove_dir_all(path)`
    RemoveDirAll(PathBuf),
    /// `remove_file(path)`
    RemoveFile(PathBuf),
}

#[derive(Default)]
struct FsState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    log: Vec<FsOp>,
}

/// In-memory [`FileSystem`] with rename/move semantics and an ordered
/// operation log.
///
/// Directories and files are tracked separately; `rename` moves a directory
/// together with everything beneath it, and fails with a not-found error
/// when the source does not exist. That failure mode is the hook the
/// install-ordering tests use to simulate an interruption between the two
/// install renames.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<FsState>>,
}

impl MemoryFileSystem {
    /// Create an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a directory without logging an operation.
    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().dirs.insert(path.into());
    }

    /// Seed a file without logging an operation.
    pub fn add_file(&self, path: impl Into<PathBuf>, contents: Vec<u8>) {
        self.state.lock().unwrap().files.insert(path.into(), contents);
    }

    /// The mutations requested so far, in order.
    pub fn operations(&self) -> Vec<FsOp> {
        self.state.lock().unwrap().log.clone()
    }

    /// Whether a directory exists right now.
    pub fn contains_dir(&self, path: &Path) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    /// Current contents of a file, if present.
    pub fn file_bytes(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    fn not_found(path: &Path) -> UpdateError {
        UpdateError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such entry: {}", path.display()),
        ))
    }
}

fn rebase(path: &Path, from: &Path, to: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rest) => to.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

impl FileSystem for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.dirs.contains(path) || state.files.contains_key(path)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), UpdateError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(FsOp::CreateDirAll(path.to_path_buf()));
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), UpdateError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(FsOp::Write(path.to_path_buf()));
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), UpdateError> {
        let mut state = self.state.lock().unwrap();
        state
            .log
            .push(FsOp::Rename(from.to_path_buf(), to.to_path_buf()));

        if state.dirs.contains(from) {
            let moved_dirs: Vec<PathBuf> = state
                .dirs
                .iter()
                .filter(|dir| dir.starts_with(from))
                .cloned()
                .collect();
            for dir in moved_dirs {
                state.dirs.remove(&dir);
                state.dirs.insert(rebase(&dir, from, to));
            }
            let moved_files: Vec<PathBuf> = state
                .files
                .keys()
                .filter(|file| file.starts_with(from))
                .cloned()
                .collect();
            for file in moved_files {
                if let Some(contents) = state.files.remove(&file) {
                    state.files.insert(rebase(&file, from, to), contents);
                }
            }
            Ok(())
        } else if let Some(contents) = state.files.remove(from) {
            state.files.insert(to.to_path_buf(), contents);
            Ok(())
        } else {
            Err(Self::not_found(from))
        }
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), UpdateError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(FsOp::RemoveDirAll(path.to_path_buf()));

        if !state.dirs.contains(path) {
            return Err(Self::not_found(path));
        }
        state.dirs.retain(|dir| !dir.starts_with(path));
        state.files.retain(|file, _| !file.starts_with(path));
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<(), UpdateError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(FsOp::RemoveFile(path.to_path_buf()));
        match state.files.remove(path) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(path)),
        }
    }

    async fn list_recursive(&self, dir: &Path) -> Result<Vec<PathBuf>, UpdateError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .keys()
            .filter(|file| file.starts_with(dir))
            .cloned()
            .collect())
    }
}

/// [`ArchiveExtractor`] that records its calls and, when given a target
/// file system and payload, materializes the payload under the destination.
#[derive(Clone, Default)]
pub struct StubExtractor {
    target: Option<MemoryFileSystem>,
    payload: Vec<(PathBuf, Vec<u8>)>,
    calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
}

impl StubExtractor {
    /// An extractor that records calls and extracts nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// An extractor that writes `payload` (destination-relative paths) into
    /// `target` on each call.
    pub fn materializing(target: MemoryFileSystem, payload: Vec<(PathBuf, Vec<u8>)>) -> Self {
        Self {
            target: Some(target),
            payload,
            calls: Arc::default(),
        }
    }

    /// Every `(archive, dest)` pair this extractor was asked to unpack.
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ArchiveExtractor for StubExtractor {
    async fn unzip(&self, archive: &Path, dest: &Path) -> Result<(), UpdateError> {
        self.calls
            .lock()
            .unwrap()
            .push((archive.to_path_buf(), dest.to_path_buf()));
        if let Some(target) = &self.target {
            for (relative, contents) in &self.payload {
                target.add_file(dest.join(relative), contents.clone());
            }
        }
        Ok(())
    }
}
