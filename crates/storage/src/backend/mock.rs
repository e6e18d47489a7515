//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{BlobAttributes, BlobProperties, ContainerAccess, Metadata, StorageBackend};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A blob as stored by the [`MockBackend`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockBlob {
    pub data: Vec<u8>,
    pub properties: BlobProperties,
    pub metadata: Metadata,
}

#[derive(Default)]
struct MockContainer {
    access: ContainerAccess,
    blobs: HashMap<String, MockBlob>,
}

/// In-memory storage backend for testing.
///
/// Containers and blobs are stored in a `HashMap` behind a [`RwLock`], so all
/// trait methods can operate on `&self` without external synchronisation.
/// Semantics follow Azure where it matters to callers: uploading resets a
/// blob's properties and metadata, and blob operations against a missing
/// container fail with [`NotFound`](ErrorKind::NotFound).
///
/// Every call that would mutate remote state is counted, which lets tests
/// assert that a run performed no writes at all.
///
/// # Examples
///
/// ```
/// use blobsync_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default();
/// assert!(backend.create_container_if_not_exists("site").await?);
/// backend.upload("site", "index.html", b"<html>".to_vec()).await?;
/// assert!(backend.fetch_attributes("site", "index.html").await?.is_some());
/// assert_eq!(backend.uploads(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<String, MockContainer>>,
    failing: RwLock<HashSet<String>>,
    uploads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend with a container pre-populated with blobs.
    ///
    /// # Example
    ///
    /// ```
    /// use blobsync_storage::backend::MockBackend;
    ///
    /// let backend = MockBackend::with_blobs("site", [
    ///     ("index.html", b"<html>".to_vec()),
    ///     ("app.js", b"console.log(1)".to_vec()),
    /// ]);
    /// ```
    pub fn with_blobs(container: impl Into<String>, blobs: impl IntoIterator<Item = (impl Into<String>, Vec<u8>)>) -> Self {
        let blobs = blobs
            .into_iter()
            .map(|(name, data)| (name.into(), MockBlob { data, ..MockBlob::default() }))
            .collect();
        let mut containers = HashMap::new();
        containers.insert(container.into(), MockContainer {
            access: ContainerAccess::Private,
            blobs,
        });
        Self {
            storage: RwLock::new(containers),
            ..Self::default()
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every later upload of the named blob fail with a network error.
    pub async fn fail_uploads_of(&self, blob: impl Into<String>) {
        self.failing.write().await.insert(blob.into());
    }

    /// Number of successful uploads so far.
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Number of successful mutating calls so far (container creation,
    /// access changes, uploads, metadata and property updates).
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of a stored blob.
    pub async fn blob(&self, container: &str, blob: &str) -> Option<MockBlob> {
        self.storage.read().await.get(container)?.blobs.get(blob).cloned()
    }

    /// Current access level of a container, if it exists.
    pub async fn access(&self, container: &str) -> Option<ContainerAccess> {
        self.storage.read().await.get(container).map(|c| c.access)
    }

    /// Overwrite the metadata of a stored blob without counting it as a
    /// write, for arranging test fixtures.
    pub async fn seed_metadata(&self, container: &str, blob: &str, metadata: Metadata) {
        if let Some(stored) = self.storage.write().await.get_mut(container).and_then(|c| c.blobs.get_mut(blob)) {
            stored.metadata = metadata;
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn missing(container: &str, blob: Option<&str>) -> exn::Exn<ErrorKind> {
        let target = match blob {
            Some(blob) => format!("{container}/{blob}"),
            None => container.to_string(),
        };
        exn::Exn::from(ErrorKind::NotFound(target))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            uploads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool> {
        let mut guard = self.storage.write().await;
        if guard.contains_key(container) {
            return Ok(false);
        }
        guard.insert(container.to_string(), MockContainer::default());
        self.record_write();
        Ok(true)
    }

    async fn set_container_access(&self, container: &str, access: ContainerAccess) -> Result<()> {
        let mut guard = self.storage.write().await;
        let stored = guard.get_mut(container).ok_or_else(|| Self::missing(container, None))?;
        stored.access = access;
        self.record_write();
        Ok(())
    }

    async fn fetch_attributes(&self, container: &str, blob: &str) -> Result<Option<BlobAttributes>> {
        let guard = self.storage.read().await;
        Ok(guard.get(container).and_then(|c| c.blobs.get(blob)).map(|stored| BlobAttributes {
            size: stored.data.len() as u64,
            properties: stored.properties.clone(),
            metadata: stored.metadata.clone(),
        }))
    }

    async fn upload(&self, container: &str, blob: &str, data: Vec<u8>) -> Result<()> {
        if self.failing.read().await.contains(blob) {
            exn::bail!(ErrorKind::Network(format!("injected upload failure for {container}/{blob}")));
        }
        let mut guard = self.storage.write().await;
        let stored = guard.get_mut(container).ok_or_else(|| Self::missing(container, None))?;
        stored.blobs.insert(blob.to_string(), MockBlob {
            data,
            properties: BlobProperties::default(),
            metadata: Metadata::new(),
        });
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.record_write();
        Ok(())
    }

    async fn set_metadata(&self, container: &str, blob: &str, metadata: &Metadata) -> Result<()> {
        let mut guard = self.storage.write().await;
        let stored = guard
            .get_mut(container)
            .and_then(|c| c.blobs.get_mut(blob))
            .ok_or_else(|| Self::missing(container, Some(blob)))?;
        stored.metadata = metadata.clone();
        self.record_write();
        Ok(())
    }

    async fn set_properties(&self, container: &str, blob: &str, properties: &BlobProperties) -> Result<()> {
        let mut guard = self.storage.write().await;
        let stored = guard
            .get_mut(container)
            .and_then(|c| c.blobs.get_mut(blob))
            .ok_or_else(|| Self::missing(container, Some(blob)))?;
        stored.properties = properties.clone();
        self.record_write();
        Ok(())
    }
}
