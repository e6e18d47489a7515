//! The synchronization loop.
//!
//! Provisions the container once, then walks the configured files strictly
//! in order. Each file is evaluated on its own: fetch the remote attributes,
//! decide staleness, and if stale upload the content and then persist the
//! metadata and properties with two separate calls. The first failure past
//! provisioning aborts the run; files after it are left untouched.

use crate::error::{ErrorKind, Result};
use crate::local::LocalFile;
use crate::provision::provision;
use crate::request::SyncRequest;
use crate::staleness::{LAST_MODIFIED_KEY, RemoteState, is_remote_stale};
use blobsync_storage::backend::DryRunBackend;
use blobsync_storage::{BackendHandle, BlobProperties, ConnectionString, Connector, ContainerHandle};
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;

/// Outcome counters of a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub considered: usize,
    pub uploaded: usize,
    pub skipped: usize,
}

/// Runs a [`SyncRequest`] against the backend produced by a [`Connector`].
///
/// # Examples
///
/// ```no_run
/// use blobsync_storage::Connector;
/// use blobsync_sync::{SyncRequest, Synchronizer};
///
/// async fn deploy(connector: impl Connector) -> blobsync_sync::error::Result<bool> {
///     let request = SyncRequest::new("UseDevelopmentStorage=true", "site", "text/html", ["dist/index.html"]);
///     Synchronizer::new(request, connector).execute().await
/// }
/// ```
pub struct Synchronizer<C> {
    request: SyncRequest,
    connector: C,
}

impl<C: Connector> Synchronizer<C> {
    pub fn new(request: SyncRequest, connector: C) -> Self {
        Self { request, connector }
    }

    /// Runs the sync and reports success as a boolean.
    ///
    /// Configuration failures (unparsable connection string, rejected
    /// credentials) are logged and reported as `Ok(false)` before any file
    /// is processed. Every other failure is returned as an error.
    pub async fn execute(&self) -> Result<bool> {
        match self.run().await {
            Ok(report) => {
                tracing::info!(
                    container = %self.request.container_name,
                    considered = report.considered,
                    uploaded = report.uploaded,
                    skipped = report.skipped,
                    "Sync complete"
                );
                Ok(true)
            },
            Err(err) if matches!(&*err, ErrorKind::Configuration) => {
                tracing::error!(error = ?err, "Storage connection could not be configured; no files processed");
                Ok(false)
            },
            Err(err) => Err(err),
        }
    }

    /// Provisions the container and processes every file.
    pub async fn run(&self) -> Result<SyncReport> {
        let container = self.provision().await?;
        let mut report = SyncReport::default();
        for path in &self.request.files {
            report.considered += 1;
            if self.sync_file(&container, path).await? {
                report.uploaded += 1;
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }

    async fn provision(&self) -> Result<ContainerHandle> {
        let request = &self.request;
        let permission = request.container_permission.as_deref();
        if !request.dry_run {
            return provision(&self.connector, &request.connection_string, &request.container_name, permission)
                .await;
        }
        let connector = &self.connector;
        let dry_run = move |connection: &ConnectionString| -> blobsync_storage::error::Result<BackendHandle> {
            let handle: BackendHandle = Arc::new(DryRunBackend::new(connector.connect(connection)?));
            Ok(handle)
        };
        provision(&dry_run, &request.connection_string, &request.container_name, permission).await
    }

    /// Returns `true` if the file was uploaded.
    async fn sync_file(&self, container: &ContainerHandle, path: &Path) -> Result<bool> {
        tracing::info!(file = %path.display(), container = container.name(), "Considering file");
        let local = LocalFile::inspect(path).await?;
        let name = local.name.as_str();

        let remote: RemoteState = container
            .fetch_attributes(name)
            .await
            .or_raise(|| ErrorKind::Fetch(name.to_string()))?
            .into();
        if !is_remote_stale(name, local.last_write, &remote) {
            return Ok(false);
        }

        let data = local.read().await?;
        let bytes = data.len();
        container.upload(name, data).await.or_raise(|| ErrorKind::Upload(name.to_string()))?;

        let properties = BlobProperties::new(self.request.content_type.as_str())
            .with_content_encoding(self.request.content_encoding.as_deref());
        // Entries written by other tools survive; only the timestamp is ours.
        let mut metadata = remote.metadata().cloned().unwrap_or_default();
        metadata.insert(LAST_MODIFIED_KEY, local.last_write.to_string());
        container
            .set_metadata(name, &metadata)
            .await
            .or_raise(|| ErrorKind::Upload(name.to_string()))?;
        container
            .set_properties(name, &properties)
            .await
            .or_raise(|| ErrorKind::Upload(name.to_string()))?;

        tracing::info!(file = name, bytes, ticks = %local.last_write, "File uploaded");
        Ok(true)
    }
}
