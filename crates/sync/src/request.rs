use std::fmt;
use std::path::PathBuf;

/// Everything one synchronization run needs to know.
///
/// Built once by the host (see `blobsync-config`) and never mutated during a
/// run.
///
/// ```
/// use blobsync_sync::SyncRequest;
///
/// let request = SyncRequest::new("UseDevelopmentStorage=true", "site", "text/html", ["dist/index.html"])
///     .with_container_permission(Some("Blob"))
///     .with_content_encoding(Some("gzip"));
/// assert_eq!(request.files.len(), 1);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Opaque storage credentials; parsed during provisioning.
    pub connection_string: String,
    pub container_name: String,
    /// Raw access level; unrecognized or missing values mean private.
    pub container_permission: Option<String>,
    /// MIME type assigned to every uploaded blob.
    pub content_type: String,
    /// Content encoding applied when non-blank.
    pub content_encoding: Option<String>,
    /// Files to consider, in order.
    pub files: Vec<PathBuf>,
    /// Decide and log everything, but leave remote state untouched.
    pub dry_run: bool,
}
impl SyncRequest {
    pub fn new(
        connection_string: impl Into<String>,
        container_name: impl Into<String>,
        content_type: impl Into<String>,
        files: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            container_name: container_name.into(),
            container_permission: None,
            content_type: content_type.into(),
            content_encoding: None,
            files: files.into_iter().map(Into::into).collect(),
            dry_run: false,
        }
    }

    pub fn with_container_permission(mut self, permission: Option<impl Into<String>>) -> Self {
        self.container_permission = permission.map(Into::into);
        self
    }

    pub fn with_content_encoding(mut self, encoding: Option<impl Into<String>>) -> Self {
        self.content_encoding = encoding.map(Into::into);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
impl fmt::Debug for SyncRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRequest")
            .field("connection_string", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("container_permission", &self.container_permission)
            .field("content_type", &self.content_type)
            .field("content_encoding", &self.content_encoding)
            .field("files", &self.files)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
