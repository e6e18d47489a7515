//! Dry-run storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return.

use async_trait::async_trait;

use crate::{
    BackendHandle, BlobAttributes, BlobProperties, ContainerAccess, Metadata, StorageBackend, error::Result,
};

/// Dry-run storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event). Attribute fetches still reach the wrapped
/// backend so staleness decisions are real.
#[derive(Clone)]
pub struct DryRunBackend {
    inner: BackendHandle,
}
impl DryRunBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for DryRunBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool> {
        tracing::info!(container, "Skipping container creation during dry run");
        Ok(false)
    }

    async fn set_container_access(&self, container: &str, access: ContainerAccess) -> Result<()> {
        tracing::info!(container, %access, "Skipping container access change during dry run");
        Ok(())
    }

    async fn fetch_attributes(&self, container: &str, blob: &str) -> Result<Option<BlobAttributes>> {
        self.inner.fetch_attributes(container, blob).await
    }

    async fn upload(&self, container: &str, blob: &str, data: Vec<u8>) -> Result<()> {
        tracing::info!(container, blob, bytes = data.len(), "Skipping upload during dry run");
        Ok(())
    }

    async fn set_metadata(&self, container: &str, blob: &str, metadata: &Metadata) -> Result<()> {
        tracing::info!(container, blob, entries = metadata.len(), "Skipping metadata update during dry run");
        Ok(())
    }

    async fn set_properties(&self, container: &str, blob: &str, properties: &BlobProperties) -> Result<()> {
        tracing::info!(
            container,
            blob,
            content_type = properties.content_type.as_deref(),
            "Skipping property update during dry run"
        );
        Ok(())
    }
}
