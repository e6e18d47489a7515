//! A backend bound to a single container.

use crate::error::Result;
use crate::{BackendHandle, BlobAttributes, BlobProperties, Metadata};
use std::fmt;

/// Handle to a provisioned container.
///
/// Cheap to clone; shares the backend it was created from. Blob operations
/// are forwarded to the backend with the container name filled in.
#[derive(Clone)]
pub struct ContainerHandle {
    backend: BackendHandle,
    name: String,
}
impl ContainerHandle {
    pub fn new(backend: BackendHandle, name: impl Into<String>) -> Self {
        Self { backend, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn fetch_attributes(&self, blob: &str) -> Result<Option<BlobAttributes>> {
        self.backend.fetch_attributes(&self.name, blob).await
    }

    pub async fn upload(&self, blob: &str, data: Vec<u8>) -> Result<()> {
        self.backend.upload(&self.name, blob, data).await
    }

    pub async fn set_metadata(&self, blob: &str, metadata: &Metadata) -> Result<()> {
        self.backend.set_metadata(&self.name, blob, metadata).await
    }

    pub async fn set_properties(&self, blob: &str, properties: &BlobProperties) -> Result<()> {
        self.backend.set_properties(&self.name, blob, properties).await
    }
}
impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("backend", &self.backend.name())
            .field("name", &self.name)
            .finish()
    }
}
