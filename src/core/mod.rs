//! Core types shared by every part of the update engine.
//!
//! Currently this is the home of the error taxonomy. All fallible operations
//! in the crate return [`UpdateError`], one variant per failure category, so
//! a host application can branch on the kind of failure instead of parsing
//! message strings.

pub mod error;

pub use error::UpdateError;
