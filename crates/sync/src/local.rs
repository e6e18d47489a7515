use crate::Ticks;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};

/// A local file considered for upload.
///
/// The blob name is the file's name alone; directories leading up to it are
/// not part of the remote key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// Remote blob name.
    pub name: String,
    /// Last write time, truncated to tick precision.
    pub last_write: Ticks,
}
impl LocalFile {
    /// Reads the file's metadata. Fails if the path does not exist, is not a
    /// regular file, or has no UTF-8 file name.
    pub async fn inspect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_raise(|| ErrorKind::InvalidFileName(path.clone()))?;
        let metadata = tokio::fs::metadata(&path).await.or_raise(|| ErrorKind::LocalFile(path.clone()))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::LocalFile(path));
        }
        let modified = metadata.modified().or_raise(|| ErrorKind::LocalFile(path.clone()))?;
        Ok(Self {
            name,
            last_write: Ticks::from(modified),
            path,
        })
    }

    /// Reads the complete file contents.
    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path).await.or_raise(|| ErrorKind::LocalFile(self.path.clone()))
    }
}
