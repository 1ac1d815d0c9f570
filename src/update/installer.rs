//! Download, staging, and the two-phase install sequence.
//!
//! [`UpdateInstaller`] owns the file-transition side of an update. Every
//! path it touches is derived from the script's live directory, as siblings,
//! so each rename stays on one filesystem:
//!
//! ```text
//! /opt/scripts/night-watch              the live directory
//! /opt/scripts/night-watch.staging      extracted update, pre-install
//! /opt/scripts/night-watch.backup       previous live directory, post-install
//! /opt/scripts/night-watch.update.zip   the downloaded archive
//! ```
//!
//! # The install contract
//!
//! `install` is two renames in a fixed order: live -> backup, then staging ->
//! live. It is recoverable but **not atomic**. If the process dies between
//! the renames, the live path is absent while both the backup and the staged
//! update still exist; an external recovery procedure can finish or undo the
//! swap using [`backup_dir`](UpdateInstaller::backup_dir) and
//! [`staging_dir`](UpdateInstaller::staging_dir). No attempt is made to fake
//! atomicity on top of the file system.
//!
//! [`rollback`](UpdateInstaller::rollback) restores the backup over a bad
//! install; [`cleanup`](UpdateInstaller::cleanup) removes the leftovers once
//! the new version is confirmed working.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::UpdateError;
use crate::host::{ArchiveExtractor, FileSystem, HttpFetch, HttpResponse, ScriptIdentity};

/// Downloads an update archive and swaps it into place with a backup.
///
/// Constructed from the host's fetch, file-system, and archive capabilities
/// plus the [`ScriptIdentity`] naming the live directory. The three
/// operations are independent: `download` stages a package, `install`
/// promotes whatever is staged, `cleanup` removes leftovers. They are
/// intended to run in that order, with the host confirming the new version
/// between `install` and `cleanup`.
///
/// # Examples
///
/// ```rust,no_run
/// use evergreen::host::native::{NativeFileSystem, ReqwestFetch, ZipExtractor};
/// use evergreen::host::ScriptIdentity;
/// use evergreen::update::UpdateInstaller;
///
/// # async fn example() -> Result<(), evergreen::core::UpdateError> {
/// let identity = ScriptIdentity::new("night-watch", "/opt/scripts/night-watch");
/// let installer = UpdateInstaller::new(
///     ReqwestFetch::new(),
///     NativeFileSystem::new(),
///     ZipExtractor::new(),
///     identity,
/// );
///
/// let staged = installer
///     .download("https://example.com/night-watch/1.5.0.zip")
///     .await?;
/// println!("staged {} file(s)", staged.len());
///
/// installer.install().await?;
/// // ... host verifies the new version actually runs ...
/// installer.cleanup().await?;
/// # Ok(())
/// # }
/// ```
pub struct UpdateInstaller<F, FS, A> {
    fetch: F,
    fs: FS,
    archive: A,
    identity: ScriptIdentity,
}

impl<F, FS, A> UpdateInstaller<F, FS, A> {
    /// Create an installer for the script identified by `identity`.
    pub fn new(fetch: F, fs: FS, archive: A, identity: ScriptIdentity) -> Self {
        Self {
            fetch,
            fs,
            archive,
            identity,
        }
    }

    /// The live script directory.
    pub fn live_dir(&self) -> &Path {
        &self.identity.dir
    }

    /// Where a downloaded update is extracted before install.
    pub fn staging_dir(&self) -> PathBuf {
        self.sibling(".staging")
    }

    /// Where the previous live directory is kept after install.
    ///
    /// Exposed so an external recovery procedure can find the rollback copy
    /// if an install is interrupted.
    pub fn backup_dir(&self) -> PathBuf {
        self.sibling(".backup")
    }

    /// The fixed path the downloaded archive is written to.
    pub fn archive_path(&self) -> PathBuf {
        self.sibling(".update.zip")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut path = self.identity.dir.clone();
        let name = self.identity.dir.file_name().unwrap_or_default().to_string_lossy();
        path.set_file_name(format!("{name}{suffix}"));
        path
    }
}

impl<F, FS, A> UpdateInstaller<F, FS, A>
where
    F: HttpFetch,
    FS: FileSystem,
    A: ArchiveExtractor,
{
    /// Download the archive at `url` and extract it into the staging
    /// directory.
    ///
    /// The response status is checked before anything touches the file
    /// system; a failed download leaves no partial state behind. On success
    /// the archive is written to [`archive_path`](Self::archive_path), the
    /// staging directory is created (recursively) if absent, the archive is
    /// extracted into it, and the recursive file listing of the staging
    /// directory is returned for the caller's verification or logging; the
    /// engine itself does not inspect the contents.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Fetch`] when the request cannot be sent.
    /// - [`UpdateError::Download`] when the response has a non-success
    ///   status; carries the URL and status for diagnostics.
    /// - [`UpdateError::Conversion`] when the body cannot be buffered.
    /// - [`UpdateError::Io`] / [`UpdateError::Extract`] for file-system and
    ///   extraction failures.
    pub async fn download(&self, url: &str) -> Result<Vec<PathBuf>, UpdateError> {
        info!("downloading update for '{}' from {url}", self.identity.name);
        let response = self.fetch.get(url).await?;
        if !response.is_success() {
            return Err(UpdateError::Download {
                url: url.to_string(),
                status: response.status(),
                status_text: response.status_text().to_string(),
            });
        }
        let body = response.bytes().await?;

        let archive_path = self.archive_path();
        let staging = self.staging_dir();
        self.fs.write(&archive_path, &body).await?;
        self.fs.create_dir_all(&staging).await?;
        self.archive.unzip(&archive_path, &staging).await?;

        let staged = self.fs.list_recursive(&staging).await?;
        debug!("staged {} file(s) under {}", staged.len(), staging.display());
        Ok(staged)
    }

    /// Promote the staged update: live -> backup, then staging -> live.
    ///
    /// The first rename must complete before the second begins, so a failure
    /// in between leaves a recoverable state (live absent, backup and
    /// staging intact) instead of destroying both versions. This is a
    /// two-phase sequence, not a transaction; see the module docs for the
    /// recovery contract. An existing backup from an earlier, unfinished
    /// update is never overwritten: the rename fails and the rollback copy
    /// stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when either rename fails.
    pub async fn install(&self) -> Result<(), UpdateError> {
        let live = self.live_dir();
        let backup = self.backup_dir();
        let staging = self.staging_dir();

        info!(
            "installing staged update for '{}' ({} -> {})",
            self.identity.name,
            staging.display(),
            live.display()
        );
        self.fs.rename(live, &backup).await?;
        self.fs.rename(&staging, live).await?;
        info!("install complete; previous version kept at {}", backup.display());
        Ok(())
    }

    /// Restore the backup over the live directory.
    ///
    /// Removes the (presumably bad) live directory if present, then renames
    /// the backup back into place.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::MissingBackup`] when no backup directory exists.
    /// - [`UpdateError::Io`] when removal or the rename fails.
    pub async fn rollback(&self) -> Result<(), UpdateError> {
        let live = self.live_dir();
        let backup = self.backup_dir();

        if !self.fs.exists(&backup).await {
            return Err(UpdateError::MissingBackup {
                path: backup.display().to_string(),
            });
        }

        info!("rolling '{}' back to {}", self.identity.name, backup.display());
        if self.fs.exists(live).await {
            self.fs.remove_dir_all(live).await?;
        }
        self.fs.rename(&backup, live).await?;
        Ok(())
    }

    /// Remove the backup directory, the staging directory, and the
    /// downloaded archive, each only if present.
    ///
    /// Meant to be called once the new version is confirmed working.
    /// Absence of any of the three is not an error, so calling this twice,
    /// or on a system that never staged anything, succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when a removal of something that does
    /// exist fails.
    pub async fn cleanup(&self) -> Result<(), UpdateError> {
        for dir in [self.backup_dir(), self.staging_dir()] {
            if self.fs.exists(&dir).await {
                debug!("removing {}", dir.display());
                self.fs.remove_dir_all(&dir).await?;
            }
        }
        let archive = self.archive_path();
        if self.fs.exists(&archive).await {
            debug!("removing {}", archive.display());
            self.fs.remove_file(&archive).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::native::{NativeFileSystem, ZipExtractor};
    use crate::test_utils::{ScriptedFetch, StubExtractor};

    fn identity() -> ScriptIdentity {
        ScriptIdentity::new("night-watch", "/opt/scripts/night-watch")
    }

    #[test]
    fn derived_paths_are_siblings_of_the_live_dir() {
        let installer = UpdateInstaller::new(
            ScriptedFetch::new(),
            NativeFileSystem::new(),
            ZipExtractor::new(),
            identity(),
        );

        assert_eq!(installer.live_dir(), Path::new("/opt/scripts/night-watch"));
        assert_eq!(
            installer.staging_dir(),
            PathBuf::from("/opt/scripts/night-watch.staging")
        );
        assert_eq!(
            installer.backup_dir(),
            PathBuf::from("/opt/scripts/night-watch.backup")
        );
        assert_eq!(
            installer.archive_path(),
            PathBuf::from("/opt/scripts/night-watch.update.zip")
        );
    }

    #[test]
    fn paths_survive_trailing_separators_in_identity() {
        let installer = UpdateInstaller::new(
            ScriptedFetch::new(),
            NativeFileSystem::new(),
            StubExtractor::default(),
            ScriptIdentity::new("night-watch", "/opt/scripts/night-watch/"),
        );
        assert_eq!(
            installer.backup_dir(),
            PathBuf::from("/opt/scripts/night-watch.backup")
        );
    }
}
