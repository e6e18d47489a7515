//! Azure Blob Storage backend.
//!
//! This module provides a storage backend implementation on top of the Azure
//! SDK for Rust. Retries, authentication and the wire protocol are all
//! handled by the SDK's default pipeline.
//!
//! # Credentials
//!
//! Credentials come from a parsed [`ConnectionString`]: account key, shared
//! access signature, or the local development storage emulator (Azurite).
//!
//! # Uploads
//!
//! Content is handed over fully buffered. Blobs up to [`SINGLE_UPLOAD_LIMIT`]
//! go out as one Put Blob request; larger ones are staged as
//! [`BLOCK_SIZE`] blocks and committed with a block list, which keeps each
//! request well under the service's per-request limits.

use crate::{
    BackendHandle, BlobAttributes, BlobProperties, ConnectionString, ContainerAccess, Credentials, Metadata,
    StorageBackend,
    error::{ErrorKind, Result},
};
use async_trait::async_trait;
use azure_core::error::{Error as AzureError, ErrorKind as AzureErrorKind};
use azure_core::request_options::Metadata as AzureMetadata;
use azure_core::StatusCode;
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::prelude::{
    BlobBlockType, BlobClient, BlobServiceClient, BlockId, BlockList, ClientBuilder, PublicAccess,
};
use bytes::Bytes;
use exn::ResultExt;
use std::ops::Range;
use std::sync::Arc;

/// Largest blob sent as a single Put Blob request.
pub const SINGLE_UPLOAD_LIMIT: usize = 64 * 1024 * 1024;
/// Size of each staged block for larger blobs.
pub const BLOCK_SIZE: usize = 8 * 1024 * 1024;

/// Azure Blob Storage backend.
///
/// Holds a service-level client; container and blob clients are cheap and
/// created per call.
///
/// # Examples
///
/// ```no_run
/// use blobsync_storage::{ConnectionString, backend::AzureBackend};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connection: ConnectionString = "UseDevelopmentStorage=true".parse()?;
/// let backend = AzureBackend::from_connection_string(&connection)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AzureBackend {
    name: String,
    service: BlobServiceClient,
}

impl AzureBackend {
    /// Create a backend from a parsed connection string.
    ///
    /// Returns [`Configuration`](ErrorKind::Configuration) if the SDK rejects
    /// the credentials (for example a malformed shared access signature).
    pub fn from_connection_string(connection: &ConnectionString) -> Result<Self> {
        let builder = match connection.credentials() {
            Credentials::DevelopmentStorage => ClientBuilder::emulator(),
            Credentials::AccessKey { account, key } => {
                Self::builder(connection, StorageCredentials::access_key(account.clone(), key.clone()))
            },
            Credentials::SharedAccessSignature(sas) => {
                let credentials = StorageCredentials::sas_token(sas).or_raise(|| {
                    ErrorKind::Configuration("shared access signature could not be parsed".to_string())
                })?;
                Self::builder(connection, credentials)
            },
        };
        Ok(Self {
            name: connection.account_name().to_string(),
            service: builder.blob_service_client(),
        })
    }

    /// [`Connector`](crate::Connector)-compatible constructor.
    pub fn connect(connection: &ConnectionString) -> Result<BackendHandle> {
        Ok(Arc::new(Self::from_connection_string(connection)?))
    }

    fn builder(connection: &ConnectionString, credentials: StorageCredentials) -> ClientBuilder {
        match Self::custom_location(connection) {
            Some(location) => ClientBuilder::with_location(location, credentials),
            None => ClientBuilder::new(connection.account_name(), credentials),
        }
    }

    /// `None` for the public cloud, where the SDK derives the endpoint from
    /// the account name.
    fn custom_location(connection: &ConnectionString) -> Option<CloudLocation> {
        connection.has_custom_endpoint().then(|| CloudLocation::Custom {
            account: connection.account_name().to_string(),
            uri: connection.blob_endpoint(),
        })
    }

    fn blob_client(&self, container: &str, blob: &str) -> BlobClient {
        self.service.container_client(container).blob_client(blob)
    }

    fn status(err: &AzureError) -> Option<StatusCode> {
        match err.kind() {
            AzureErrorKind::HttpResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_not_found(err: &AzureError) -> bool {
        matches!(Self::status(err), Some(StatusCode::NotFound))
    }

    fn is_conflict(err: &AzureError) -> bool {
        matches!(Self::status(err), Some(StatusCode::Conflict))
    }

    /// Byte ranges of the blocks a blob of `len` bytes is staged in.
    fn block_ranges(len: usize, block_size: usize) -> impl Iterator<Item = Range<usize>> {
        (0..len).step_by(block_size.max(1)).map(move |start| start..(start + block_size).min(len))
    }

    /// Block ids must all have the same length within a blob.
    fn block_name(index: usize) -> String {
        format!("{index:08}")
    }

    async fn upload_blocks(&self, client: &BlobClient, data: Bytes, target: &str) -> Result<usize> {
        let mut block_list = BlockList::default();
        for (index, range) in Self::block_ranges(data.len(), BLOCK_SIZE).enumerate() {
            let block_id = BlockId::new(Self::block_name(index));
            let result = client.put_block(block_id.clone(), data.slice(range)).await;
            Self::raise(result, || target.to_string())?;
            block_list.blocks.push(BlobBlockType::new_uncommitted(block_id));
        }
        let blocks = block_list.blocks.len();
        let result = client.put_block_list(block_list).await;
        Self::raise(result, || target.to_string())?;
        Ok(blocks)
    }

    /// Translate an SDK error into an actionable storage error kind.
    fn classify(err: &AzureError, target: String) -> ErrorKind {
        match (err.kind(), Self::status(err)) {
            (_, Some(StatusCode::NotFound)) => ErrorKind::NotFound(target),
            (_, Some(StatusCode::Forbidden | StatusCode::Unauthorized)) => ErrorKind::PermissionDenied(target),
            (AzureErrorKind::Io, _) => ErrorKind::Network(format!("{target}: {err}")),
            _ => ErrorKind::BackendError(format!("{target}: {err}")),
        }
    }

    fn raise<T>(result: azure_core::Result<T>, target: impl FnOnce() -> String) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let kind = Self::classify(&err, target());
                Err(err).or_raise(|| kind)
            },
        }
    }
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool> {
        match self.service.container_client(container).create().await {
            Ok(_) => Ok(true),
            Err(err) if Self::is_conflict(&err) => Ok(false),
            Err(err) => Self::raise(Err(err), || container.to_string()),
        }
    }

    async fn set_container_access(&self, container: &str, access: ContainerAccess) -> Result<()> {
        let public_access = match access {
            ContainerAccess::Private => PublicAccess::None,
            ContainerAccess::Blob => PublicAccess::Blob,
            ContainerAccess::Container => PublicAccess::Container,
        };
        let result = self.service.container_client(container).set_acl(public_access).await;
        Self::raise(result, || container.to_string()).map(|_| ())
    }

    async fn fetch_attributes(&self, container: &str, blob: &str) -> Result<Option<BlobAttributes>> {
        let response = match self.blob_client(container, blob).get_properties().await {
            Ok(response) => response,
            // Covers both a missing blob and a missing container.
            Err(err) if Self::is_not_found(&err) => return Ok(None),
            Err(err) => return Self::raise(Err(err), || format!("{container}/{blob}")),
        };
        let properties = response.blob.properties;
        let metadata: Metadata = response.blob.metadata.unwrap_or_default().into_iter().collect();
        Ok(Some(BlobAttributes {
            size: properties.content_length,
            properties: BlobProperties {
                content_type: Some(properties.content_type).filter(|ct| !ct.is_empty()),
                content_encoding: properties.content_encoding.filter(|ce| !ce.is_empty()),
            },
            metadata,
        }))
    }

    async fn upload(&self, container: &str, blob: &str, data: Vec<u8>) -> Result<()> {
        let bytes = data.len();
        let client = self.blob_client(container, blob);
        let target = format!("{container}/{blob}");
        if bytes <= SINGLE_UPLOAD_LIMIT {
            let result = client.put_block_blob(Bytes::from(data)).await;
            Self::raise(result, || target)?;
            tracing::debug!(backend = %self.name, container, blob, bytes, "Uploaded block blob");
        } else {
            let blocks = self.upload_blocks(&client, Bytes::from(data), &target).await?;
            tracing::debug!(backend = %self.name, container, blob, bytes, blocks, "Uploaded block blob in blocks");
        }
        Ok(())
    }

    async fn set_metadata(&self, container: &str, blob: &str, metadata: &Metadata) -> Result<()> {
        let mut azure_metadata = AzureMetadata::new();
        for (key, value) in metadata.iter() {
            azure_metadata.insert(key.to_string(), value.to_string());
        }
        let result = self.blob_client(container, blob).set_metadata().metadata(azure_metadata).await;
        Self::raise(result, || format!("{container}/{blob}")).map(|_| ())
    }

    async fn set_properties(&self, container: &str, blob: &str, properties: &BlobProperties) -> Result<()> {
        let mut builder = self.blob_client(container, blob).set_properties();
        if let Some(content_type) = &properties.content_type {
            builder = builder.content_type(content_type.clone());
        }
        if let Some(content_encoding) = &properties.content_encoding {
            builder = builder.content_encoding(content_encoding.clone());
        }
        Self::raise(builder.await, || format!("{container}/{blob}")).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn http_error(status: StatusCode) -> AzureError {
        AzureError::new(AzureErrorKind::HttpResponse { status, error_code: None }, "request failed")
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        assert!(AzureBackend::is_not_found(&http_error(StatusCode::NotFound)));
        assert!(!AzureBackend::is_not_found(&http_error(StatusCode::Forbidden)));
        assert!(!AzureBackend::is_not_found(&AzureError::new(AzureErrorKind::Io, "connection reset")));
    }

    #[test]
    fn test_existing_container_is_conflict() {
        assert!(AzureBackend::is_conflict(&http_error(StatusCode::Conflict)));
        assert!(!AzureBackend::is_conflict(&http_error(StatusCode::NotFound)));
    }

    #[rstest]
    #[case(StatusCode::NotFound, "not found")]
    #[case(StatusCode::Forbidden, "permission denied")]
    #[case(StatusCode::Unauthorized, "permission denied")]
    #[case(StatusCode::InternalServerError, "backend error")]
    #[case(StatusCode::Conflict, "backend error")]
    fn test_classify_status(#[case] status: StatusCode, #[case] prefix: &str) {
        let kind = AzureBackend::classify(&http_error(status), "site/index.html".to_string());
        assert!(kind.to_string().starts_with(prefix), "{kind}");
    }

    #[test]
    fn test_classify_io_is_network() {
        let kind = AzureBackend::classify(&AzureError::new(AzureErrorKind::Io, "connection reset"), "site".to_string());
        assert!(matches!(kind, ErrorKind::Network(_)));
        assert!(kind.is_retryable());
    }

    #[test]
    fn test_raise_keeps_kind() {
        let result: azure_core::Result<()> = Err(http_error(StatusCode::Forbidden));
        let err = AzureBackend::raise(result, || "site/a.txt".to_string()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(target) if target == "site/a.txt"));
    }

    #[test]
    fn test_public_cloud_uses_default_location() {
        let connection: ConnectionString = "AccountName=site;AccountKey=a2V5".parse().unwrap();
        assert!(AzureBackend::custom_location(&connection).is_none());
    }

    #[rstest]
    #[case("BlobEndpoint=https://cdn.example.net/;SharedAccessSignature=sv=1&sig=2", "", "https://cdn.example.net")]
    #[case(
        "AccountName=site;AccountKey=a2V5;EndpointSuffix=core.chinacloudapi.cn",
        "site",
        "https://site.blob.core.chinacloudapi.cn"
    )]
    fn test_custom_location(#[case] input: &str, #[case] expected_account: &str, #[case] expected_uri: &str) {
        let connection: ConnectionString = input.parse().unwrap();
        match AzureBackend::custom_location(&connection) {
            Some(CloudLocation::Custom { account, uri }) => {
                assert_eq!(account, expected_account);
                assert_eq!(uri, expected_uri);
            },
            _ => panic!("expected a custom location for {input}"),
        }
    }

    #[test]
    fn test_block_ranges() {
        let ranges: Vec<_> = AzureBackend::block_ranges(25, 10).collect();
        assert_eq!(ranges, vec![0..10, 10..20, 20..25]);
        assert_eq!(AzureBackend::block_ranges(20, 10).count(), 2);
        assert_eq!(AzureBackend::block_ranges(0, 10).count(), 0);

        let large = SINGLE_UPLOAD_LIMIT + 1;
        let ranges: Vec<_> = AzureBackend::block_ranges(large, BLOCK_SIZE).collect();
        assert_eq!(ranges.len(), SINGLE_UPLOAD_LIMIT / BLOCK_SIZE + 1);
        assert_eq!(ranges.last(), Some(&(SINGLE_UPLOAD_LIMIT..large)));
    }

    #[test]
    fn test_block_names_have_equal_length() {
        assert_eq!(AzureBackend::block_name(0), "00000000");
        assert_eq!(AzureBackend::block_name(12_345), "00012345");
        let last = SINGLE_UPLOAD_LIMIT.div_ceil(BLOCK_SIZE) * 1_000;
        assert_eq!(AzureBackend::block_name(last).len(), 8);
    }

    #[test]
    fn test_development_storage_builds() {
        let connection: ConnectionString = "UseDevelopmentStorage=true".parse().unwrap();
        let backend = AzureBackend::from_connection_string(&connection).unwrap();
        assert_eq!(backend.name(), "devstoreaccount1");
    }
}
