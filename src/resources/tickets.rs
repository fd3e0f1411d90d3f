use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::{query_pairs, ClientCore};
use crate::error::{ApiError, HaloError};
use crate::models::{CreateTicketRequest, Ticket, TicketFilter, TicketsResponse, UpdateTicketRequest};
use crate::pipeline::ResourceRef;

const PATH: &str = "/api/Tickets";
const RESOURCE: &str = "Ticket";

/// Halo answers a save with the record, or with a one-element array.
#[derive(Deserialize)]
#[serde(untagged)]
enum Saved {
    Many(Vec<Ticket>),
    One(Box<Ticket>),
}

impl Saved {
    fn into_ticket(self) -> Result<Ticket, HaloError> {
        match self {
            Saved::Many(tickets) => tickets
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::generic("Halo returned no ticket for the save").into()),
            Saved::One(ticket) => Ok(*ticket),
        }
    }
}

/// Tickets: list with filters, get, create, update, delete.
///
/// Creates and updates both POST to `/api/Tickets` with a one-element array;
/// Halo tells them apart by the presence of `id`.
#[derive(Clone)]
pub struct TicketsApi {
    core: Arc<ClientCore>,
}

impl TicketsApi {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Lists tickets matching `filter`.
    ///
    /// Returns the envelope so callers can page with
    /// [`TicketsResponse::has_more`].
    pub async fn list(
        &self,
        filter: &TicketFilter,
        cancel: &CancellationToken,
    ) -> Result<TicketsResponse, HaloError> {
        let query = query_pairs(filter)?;
        let response: TicketsResponse = self.core.get_json(PATH, &query, None, cancel).await?;
        tracing::debug!(
            returned = response.tickets.len(),
            record_count = response.record_count,
            "Listed tickets"
        );
        Ok(response)
    }

    /// Gets a ticket with its details.
    ///
    /// # Errors
    ///
    /// A missing ticket is a `NotFound` error naming `Ticket` and the id.
    pub async fn get(&self, id: i64, cancel: &CancellationToken) -> Result<Ticket, HaloError> {
        let query = [("includedetails".to_string(), "true".to_string())];
        self.core
            .get_json(
                &format!("{}/{}", PATH, id),
                &query,
                Some(ResourceRef::new(RESOURCE, id)),
                cancel,
            )
            .await
    }

    /// Creates a ticket and returns it as saved by Halo.
    pub async fn create(
        &self,
        request: &CreateTicketRequest,
        cancel: &CancellationToken,
    ) -> Result<Ticket, HaloError> {
        let saved: Saved = self.core.post_json(PATH, &[request], None, cancel).await?;
        let ticket = saved.into_ticket()?;
        tracing::info!(ticket_id = ticket.id, "Created ticket");
        Ok(ticket)
    }

    /// Applies the set fields of `request` to ticket `id`.
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateTicketRequest,
        cancel: &CancellationToken,
    ) -> Result<Ticket, HaloError> {
        let mut body = serde_json::to_value(request)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("id".to_string(), Value::from(id));
        }

        let saved: Saved = self
            .core
            .post_json(PATH, &[body], Some(ResourceRef::new(RESOURCE, id)), cancel)
            .await?;
        let ticket = saved.into_ticket()?;
        tracing::info!(ticket_id = ticket.id, "Updated ticket");
        Ok(ticket)
    }

    /// Deletes ticket `id`.
    pub async fn delete(&self, id: i64, cancel: &CancellationToken) -> Result<(), HaloError> {
        self.core
            .delete(
                &format!("{}/{}", PATH, id),
                Some(ResourceRef::new(RESOURCE, id)),
                cancel,
            )
            .await?;
        tracing::info!(ticket_id = id, "Deleted ticket");
        Ok(())
    }
}
