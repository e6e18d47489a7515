//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Storage failures are raised into
//! these kinds with the storage error kept as a child in the error tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a sync failure.
///
/// ### Recoverable
/// - [`ErrorKind::Configuration`] - reported to the host as a failed run,
///   no files are touched.
///
/// ### Escalated
/// - [`ErrorKind::Provision`]
/// - [`ErrorKind::LocalFile`]
/// - [`ErrorKind::InvalidFileName`]
/// - [`ErrorKind::Fetch`]
/// - [`ErrorKind::Upload`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The connection string could not be turned into storage credentials.
    #[display("storage connection could not be configured")]
    Configuration,
    /// The container could not be created or its access level set.
    #[display("container `{_0}` could not be provisioned")]
    Provision(#[error(not(source))] String),
    /// A local file could not be inspected or read.
    #[display("local file unavailable: {}", _0.display())]
    LocalFile(#[error(not(source))] PathBuf),
    /// A local path has no usable file name to use as the blob name.
    #[display("no usable file name: {}", _0.display())]
    InvalidFileName(#[error(not(source))] PathBuf),
    /// Fetching the attributes of an existing blob failed.
    #[display("attributes of blob `{_0}` could not be fetched")]
    Fetch(#[error(not(source))] String),
    /// Uploading a blob or persisting its metadata/properties failed.
    #[display("blob `{_0}` could not be uploaded")]
    Upload(#[error(not(source))] String),
    /// A tick count is not a valid timestamp.
    #[display("invalid tick count: {_0}")]
    InvalidTicks(#[error(not(source))] String),
}
