//! Error handling for the update engine.
//!
//! Every failure the engine can produce is a variant of [`UpdateError`], so
//! callers branch on kind rather than string-matching messages. The variants
//! map one-to-one onto the failure categories of the update flow:
//!
//! - [`UpdateError::Validation`] - a version string violates the
//!   dotted-numeric grammar
//! - [`UpdateError::Fetch`] - the manifest request failed (transport error or
//!   non-success status)
//! - [`UpdateError::ManifestParse`] - the manifest body is not a valid
//!   version list
//! - [`UpdateError::Download`] - the archive download returned a non-success
//!   status
//! - [`UpdateError::Conversion`] - a response body could not be materialized
//!   as bytes
//! - [`UpdateError::Extract`] - archive extraction failed
//! - [`UpdateError::MissingBackup`] - rollback requested with nothing to
//!   roll back to
//! - [`UpdateError::Io`] - file-system capability failures, converted from
//!   [`std::io::Error`]
//!
//! Best-effort cache writes are not part of this taxonomy:
//! [`UpdateCache::save`](crate::update::UpdateCache::save) reports failure as
//! a boolean; losing the cache costs a refetch, not correctness.
//!
//! `Display` output is written for end users; the host UI can surface an
//! error's message directly.
//!
//! # Examples
//!
//! ```rust,no_run
//! use evergreen::core::UpdateError;
//!
//! fn describe(err: &UpdateError) -> String {
//!     match err {
//!         UpdateError::Download { url, status, .. } => {
//!             format!("could not download {url} (HTTP {status}), try again later")
//!         }
//!         UpdateError::Validation { param, .. } => {
//!             format!("bad version string passed as '{param}'")
//!         }
//!         other => other.to_string(),
//!     }
//! }
//! ```

use thiserror::Error;

/// The error type for all update engine operations.
///
/// Each variant carries the context a caller needs to react or to render a
/// useful diagnostic: URLs, HTTP statuses, offending parameter names, and
/// paths. No operation in this crate retries on its own; recovery decisions
/// belong to the caller.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A version string does not match the dotted-numeric grammar.
    ///
    /// The grammar accepts one to four dot-separated non-negative integer
    /// components (`"1"`, `"1.2"`, `"1.2.3.4"`). Anything else, including
    /// pre-release suffixes like `"1.2-beta"`, is rejected rather than
    /// compared leniently.
    ///
    /// # Fields
    /// - `param`: which parameter held the offending string
    /// - `value`: the string that failed to parse
    #[error("invalid version string for '{param}': \"{value}\" (expected 1-4 dot-separated numbers)")]
    Validation {
        /// Name of the parameter that held the offending string.
        param: String,
        /// The string that failed validation.
        value: String,
    },

    /// The version manifest could not be fetched.
    ///
    /// Raised for transport failures and for non-success HTTP statuses during
    /// an update check. The cached version list is left exactly as it was
    /// loaded.
    #[error("failed to fetch update manifest from {url}: {reason}")]
    Fetch {
        /// The manifest URL that was requested.
        url: String,
        /// Transport error text or `HTTP <status> <reason>`.
        reason: String,
    },

    /// The manifest response body is not a valid version list.
    #[error("invalid update manifest from {url}: {reason}")]
    ManifestParse {
        /// The manifest URL that produced the body.
        url: String,
        /// Why deserialization failed.
        reason: String,
    },

    /// The update archive download returned a non-success status.
    ///
    /// Carries the original URL and the response status so user-facing
    /// diagnostics can distinguish a missing package from a generic network
    /// failure.
    #[error("download of {url} failed: HTTP {status} {status_text}")]
    Download {
        /// The archive URL that was requested.
        url: String,
        /// HTTP status code of the response.
        status: u16,
        /// Reason phrase of the response, if any.
        status_text: String,
    },

    /// A response body could not be materialized as a byte buffer.
    #[error("could not read response body: {reason}")]
    Conversion {
        /// Why the body conversion failed.
        reason: String,
    },

    /// Extraction of a downloaded archive failed.
    #[error("failed to extract archive {path}: {reason}")]
    Extract {
        /// Path of the archive being extracted.
        path: String,
        /// Extractor error text.
        reason: String,
    },

    /// A rollback was requested but no backup directory exists.
    #[error("no backup present at {path}; nothing to roll back to")]
    MissingBackup {
        /// Where the backup directory was expected.
        path: String,
    },

    /// A file-system capability operation failed.
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
}
