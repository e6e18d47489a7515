//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the call contract the
//! synchronizer needs from a blob storage service, and the `Connector` trait
//! that turns a parsed [`ConnectionString`] into a backend.
//!

#[cfg(feature = "azure")]
mod azure;
mod dry_run;
#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "azure")]
pub use self::azure::AzureBackend;
pub use self::dry_run::DryRunBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::{BackendHandle, BlobAttributes, BlobProperties, ConnectionString, ContainerAccess, Metadata};
use async_trait::async_trait;

/// Unified interface for blob storage backends.
///
/// Every method is a single remote operation. Nothing is retried or batched
/// at this level; retry policy belongs to the underlying client library.
///
/// # Examples
///
/// ```
/// use blobsync_storage::{backend::StorageBackend, error::Result, Metadata};
///
/// async fn recorded_ticks(backend: &dyn StorageBackend) -> Result<Option<String>> {
///     Ok(backend
///         .fetch_attributes("site", "index.html")
///         .await?
///         .and_then(|attributes| attributes.metadata.get("LastModified").map(str::to_string)))
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend (account name, or a fixed name for test and
    /// wrapper backends). Used for logging only.
    fn name(&self) -> &str;

    /// Create a container if it does not exist yet.
    ///
    /// Returns `true` if the container was created by this call, `false` if
    /// it already existed. Must be safe to call on every invocation.
    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool>;

    /// Replace the public access level of a container.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// container does not exist.
    async fn set_container_access(&self, container: &str, access: ContainerAccess) -> Result<()>;

    /// Fetch the properties and metadata of a blob without its content.
    ///
    /// Returns `Ok(None)` when the blob (or its container) does not exist.
    /// Any other failure is an error.
    async fn fetch_attributes(&self, container: &str, blob: &str) -> Result<Option<BlobAttributes>>;

    /// Upload the complete content of a blob, creating it or overwriting any
    /// existing content.
    ///
    /// # Notes
    /// - As with Azure's Put Blob, an upload resets the blob's properties and
    ///   metadata. Callers set them again afterwards.
    async fn upload(&self, container: &str, blob: &str, data: Vec<u8>) -> Result<()>;

    /// Replace all user-defined metadata of an existing blob.
    async fn set_metadata(&self, container: &str, blob: &str, metadata: &Metadata) -> Result<()>;

    /// Replace the managed system properties of an existing blob.
    ///
    /// A `None` field clears the corresponding property.
    async fn set_properties(&self, container: &str, blob: &str, properties: &BlobProperties) -> Result<()>;
}

/// Builds a backend from a connection string.
///
/// Implemented for any `Fn(&ConnectionString) -> Result<BackendHandle>`, so
/// tests can hand in a closure that returns a shared
/// [`MockBackend`](crate::backend::MockBackend).
pub trait Connector: Send + Sync {
    fn connect(&self, connection: &ConnectionString) -> Result<BackendHandle>;
}
impl<F> Connector for F
where
    F: Fn(&ConnectionString) -> Result<BackendHandle> + Send + Sync,
{
    fn connect(&self, connection: &ConnectionString) -> Result<BackendHandle> {
        self(connection)
    }
}
