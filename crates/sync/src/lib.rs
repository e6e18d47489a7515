//! Uploads local files to a blob container when their content is newer than
//! what was uploaded last time.
//!
//! The last-write time of each uploaded file is recorded on the blob as
//! `LastModified` metadata (see [`Ticks`]). A later run compares the local
//! last-write time against that record and skips files that have not changed.

pub mod error;
mod local;
mod provision;
mod request;
mod run;
mod staleness;
mod ticks;

pub use crate::local::LocalFile;
pub use crate::provision::{provision, resolve_access};
pub use crate::request::SyncRequest;
pub use crate::run::{SyncReport, Synchronizer};
pub use crate::staleness::{LAST_MODIFIED_KEY, RemoteState, is_remote_stale};
pub use crate::ticks::Ticks;
