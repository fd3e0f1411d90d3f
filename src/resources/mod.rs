//! Resource groups, one per Halo endpoint.
//!
//! Each group is a thin mapping from typed calls to REST requests. Response
//! shapes differ per endpoint (bare arrays for ticket types, envelopes with
//! a record count elsewhere) and are kept as Halo sends them.
//!
//! Every operation takes the caller's [`CancellationToken`] last.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::client::ClientCore;
use crate::error::HaloError;
use crate::models::Envelope;
use crate::pipeline::ResourceRef;

mod assets;
mod clients;
mod projects;
mod ticket_types;
mod tickets;
mod users;

pub use assets::AssetsApi;
pub use clients::ClientsApi;
pub use projects::ProjectsApi;
pub use ticket_types::TicketTypesApi;
pub use tickets::TicketsApi;
pub use users::UsersApi;

/// Fetches an envelope from a list endpoint.
async fn list_envelope<E: Envelope>(
    core: &ClientCore,
    path: &str,
    cancel: &CancellationToken,
) -> Result<E, HaloError> {
    let envelope: E = core.get_json(path, &[], None, cancel).await?;
    tracing::debug!(path, record_count = envelope.record_count(), "Listed records");
    Ok(envelope)
}

/// Fetches one record by id. A 404 names the resource type and id.
async fn get_by_id<T: DeserializeOwned>(
    core: &ClientCore,
    path: &str,
    resource_type: &str,
    id: i64,
    cancel: &CancellationToken,
) -> Result<T, HaloError> {
    core.get_json(
        &format!("{}/{}", path, id),
        &[],
        Some(ResourceRef::new(resource_type, id)),
        cancel,
    )
    .await
}

