use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::ClientCore;
use crate::error::HaloError;
use crate::models::TicketType;

const PATH: &str = "/api/TicketType";

/// Ticket types. Halo returns these as a bare array.
#[derive(Clone)]
pub struct TicketTypesApi {
    core: Arc<ClientCore>,
}

impl TicketTypesApi {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Lists all ticket types.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<TicketType>, HaloError> {
        self.core.get_json(PATH, &[], None, cancel).await
    }
}
