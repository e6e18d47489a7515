//! Staleness evaluation.
//!
//! The only timestamp that matters is the local last-write time recorded in
//! the blob's `LastModified` metadata at upload time. The server-side
//! modification time of the blob is never consulted: it reflects when the
//! upload happened, not which version of the file was uploaded.

use crate::Ticks;
use blobsync_storage::{BlobAttributes, Metadata};

/// Metadata key holding the local last-write time of the uploaded file.
pub const LAST_MODIFIED_KEY: &str = "LastModified";

/// What the remote store knows about a blob before a sync decision.
///
/// Fetch failures other than "does not exist" are not a state; they are
/// errors and abort the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteState {
    /// No blob with this name exists yet.
    Absent,
    /// The blob exists; its metadata may or may not carry a timestamp.
    Present(BlobAttributes),
}
impl RemoteState {
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Absent => None,
            Self::Present(attributes) => Some(&attributes.metadata),
        }
    }

    /// The recorded local timestamp of the last upload.
    ///
    /// Missing or blank values mean [`Ticks::MIN`]. A value that is not a
    /// valid tick count is treated the same way, so a corrupted entry leads
    /// to a fresh upload instead of a stuck file.
    pub fn recorded_ticks(&self, file: &str) -> Ticks {
        let Some(value) = self
            .metadata()
            .and_then(|metadata| metadata.get(LAST_MODIFIED_KEY))
            .filter(|value| !value.trim().is_empty())
        else {
            return Ticks::MIN;
        };
        match value.parse::<Ticks>() {
            Ok(ticks) => ticks,
            Err(_) => {
                tracing::warn!(file, value, "Malformed LastModified metadata; treating remote as outdated");
                Ticks::MIN
            },
        }
    }
}
impl From<Option<BlobAttributes>> for RemoteState {
    fn from(attributes: Option<BlobAttributes>) -> Self {
        match attributes {
            Some(attributes) => Self::Present(attributes),
            None => Self::Absent,
        }
    }
}

/// Decides whether the remote copy of `file` must be replaced.
///
/// The remote copy is stale unless its recorded timestamp is at or after
/// the local last-write time; equal timestamps are not stale.
pub fn is_remote_stale(file: &str, local_last_write: Ticks, remote: &RemoteState) -> bool {
    let recorded = remote.recorded_ticks(file);
    if recorded >= local_last_write {
        tracing::info!(
            file,
            local = %local_last_write,
            remote = %recorded,
            "Local file is not newer than remote; skipping"
        );
        return false;
    }
    true
}
