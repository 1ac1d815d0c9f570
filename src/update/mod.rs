//! The update engine: cache, checker, and installer.
//!
//! This module is the heart of the crate. The three pieces cooperate but are
//! independently usable:
//!
//! - [`UpdateCache`] persists the last manifest fetch through the host's
//!   key-value store, so checks inside the configured interval stay off the
//!   network.
//! - [`UpdateChecker`] runs the interval gate, refreshes the cache when it is
//!   stale, and reports which published versions are newer than the running
//!   one.
//! - [`UpdateInstaller`] downloads a chosen release, stages it, and performs
//!   the backup-then-promote directory swap, with rollback and cleanup.
//!
//! # Update flow
//!
//! ```text
//! 1. Check
//!    ├── load cached record (default on first run)
//!    ├── stale per CheckInterval? -> GET manifest, replace cache, save (best effort)
//!    └── return versions newer than the running one, manifest order
//!
//! 2. Download (for the version the host picked)
//!    ├── GET archive -> <live>.update.zip
//!    └── extract into <live>.staging, return the staged file list
//!
//! 3. Install
//!    ├── rename <live>      -> <live>.backup
//!    └── rename <live>.staging -> <live>       (strictly after the backup rename)
//!
//! 4. Cleanup (after the host confirms the new version)
//!    └── remove backup, staging, and the archive (whichever exist)
//! ```
//!
//! The swap in step 3 is recoverable but not atomic; see
//! [`installer`] for the exact contract.

pub mod cache;
pub mod checker;
pub mod installer;


pub use cache::{CacheRecord, UpdateCache, VersionData};
pub use checker::{CheckInterval, UpdateChecker, cutoff_millis};
pub use installer::UpdateInstaller;
