pub mod backend;
mod connection;
mod container;
pub mod error;
mod models;

pub use crate::backend::{Connector, StorageBackend};
pub use crate::connection::{ConnectionString, Credentials};
pub use crate::container::ContainerHandle;
pub use crate::models::{BlobAttributes, BlobProperties, ContainerAccess, Metadata};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
