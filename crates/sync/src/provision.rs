//! Container provisioning.
//!
//! Turns a connection string into a backend and makes sure the destination
//! container exists with the requested public access level. Safe to run on
//! every invocation.

use crate::error::{ErrorKind, Result};
use blobsync_storage::{ConnectionString, Connector, ContainerAccess, ContainerHandle};
use exn::ResultExt;
use tracing::instrument;

/// Resolves a configured access level, falling back to the most restrictive
/// level rather than failing.
///
/// Missing or blank values resolve silently; anything else that does not
/// parse is logged at `warn`.
pub fn resolve_access(permission: Option<&str>) -> ContainerAccess {
    let Some(permission) = permission.map(str::trim).filter(|p| !p.is_empty()) else {
        return ContainerAccess::default();
    };
    match permission.parse::<ContainerAccess>() {
        Ok(access) => access,
        Err(err) => {
            let reason = (*err).to_string();
            tracing::warn!(permission, %reason, "Unrecognized container permission; using private access");
            ContainerAccess::default()
        },
    }
}

/// Ensures the container exists and has the requested access level.
///
/// Fails with [`ErrorKind::Configuration`] when the connection string cannot
/// be parsed or the connector rejects it; nothing remote has been touched in
/// that case. Remote failures raise [`ErrorKind::Provision`].
#[instrument(skip(connector, connection_string), fields(backend))]
pub async fn provision(
    connector: &dyn Connector,
    connection_string: &str,
    container_name: &str,
    permission: Option<&str>,
) -> Result<ContainerHandle> {
    let connection = connection_string.parse::<ConnectionString>().or_raise(|| ErrorKind::Configuration)?;
    let backend = connector.connect(&connection).or_raise(|| ErrorKind::Configuration)?;
    tracing::Span::current().record("backend", backend.name());

    let access = resolve_access(permission);
    let created = backend
        .create_container_if_not_exists(container_name)
        .await
        .or_raise(|| ErrorKind::Provision(container_name.to_string()))?;
    backend
        .set_container_access(container_name, access)
        .await
        .or_raise(|| ErrorKind::Provision(container_name.to_string()))?;
    tracing::debug!(container = container_name, created, %access, "Container provisioned");

    Ok(ContainerHandle::new(backend, container_name))
}
