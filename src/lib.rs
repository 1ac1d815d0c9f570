//! evergreen - self-update engine for long-lived scripts
//!
//! A host application embeds this crate to keep a managed script current: it
//! checks a remote JSON manifest for newer versions, caches the answer so
//! repeated checks stay off the network, downloads and unpacks an update
//! archive, and swaps the script's live directory for the new one with a
//! backup kept for rollback.
//!
//! # Architecture Overview
//!
//! The engine is split along one seam: *decisions* live here,
//! *primitives* are injected. Network access, persisted key-value storage,
//! file-system operations, and archive extraction are capability traits in
//! [`host`]; production implementations backed by `reqwest`, `tokio::fs`,
//! `zip`, and a JSON-file store ship in [`host::native`], and scripted
//! in-memory versions for tests ship in `test_utils` (behind the
//! `test-utils` feature).
//!
//! ## Key Pieces
//!
//! - [`version`] - the dotted-numeric version grammar and comparator
//!   (1-4 components, no pre-release syntax)
//! - [`update::UpdateCache`] - the persisted last-checked/known-versions
//!   record, loaded and saved best-effort through a key-value store
//! - [`update::UpdateChecker`] - interval-gated manifest refresh plus
//!   newer-than-current filtering
//! - [`update::UpdateInstaller`] - download -> stage -> backup-then-promote
//!   install -> cleanup, with an explicit rollback
//! - [`UpdateError`](crate::core::UpdateError) - one tagged variant per
//!   failure category
//!
//! ## Guarantees and Non-Guarantees
//!
//! - Within one check: cache load -> fetch (if stale) -> cache save -> filter,
//!   strictly in that order, with no re-read of the store.
//! - A failed manifest fetch never mutates the cache; a failed cache *write*
//!   never fails the check.
//! - The install swap is recoverable but **not atomic**: the previous
//!   version survives at the backup path until [`cleanup`] runs, and an
//!   interruption between the two renames leaves both old and new trees on
//!   disk. See [`update::installer`] for the exact contract.
//! - No authentication, signature verification, delta patching, or
//!   multi-instance coordination; single-instance hosts only.
//!
//! # Example
//!
//! ```rust,no_run
//! use evergreen::host::native::{JsonFileStore, NativeFileSystem, ReqwestFetch, ZipExtractor};
//! use evergreen::host::ScriptIdentity;
//! use evergreen::update::{CheckInterval, UpdateCache, UpdateChecker, UpdateInstaller};
//!
//! # async fn example() -> Result<(), evergreen::core::UpdateError> {
//! let identity = ScriptIdentity::new("night-watch", "/opt/scripts/night-watch");
//!
//! let checker = UpdateChecker::new(
//!     UpdateCache::new(JsonFileStore::new("/var/lib/night-watch"), &identity),
//!     ReqwestFetch::new(),
//! );
//! let newer = checker
//!     .check_for_update(
//!         "https://example.com/night-watch/versions.json",
//!         CheckInterval::Daily,
//!         "1.4.2",
//!     )
//!     .await?;
//!
//! if let Some(release) = newer.first() {
//!     let installer = UpdateInstaller::new(
//!         ReqwestFetch::new(),
//!         NativeFileSystem::new(),
//!         ZipExtractor::new(),
//!         identity,
//!     );
//!     installer.download(&release.url).await?;
//!     installer.install().await?;
//!     // ... run the new version's own health check here ...
//!     installer.cleanup().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`cleanup`]: update::UpdateInstaller::cleanup

#![allow(async_fn_in_trait)]

pub mod core;
pub mod host;
pub mod update;
pub mod version;

// Scripted host capabilities, available to unit tests and (via the
// `test-utils` feature) to integration tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
