use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{get_by_id, list_envelope};
use crate::client::ClientCore;
use crate::error::HaloError;
use crate::models::{Client, ClientsResponse};

const PATH: &str = "/api/Client";

/// Customers (Halo calls them clients).
#[derive(Clone)]
pub struct ClientsApi {
    core: Arc<ClientCore>,
}

impl ClientsApi {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Lists customers, unwrapped from the envelope.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Client>, HaloError> {
        Ok(self.list_response(cancel).await?.clients)
    }

    /// Lists customers with the envelope intact.
    pub async fn list_response(&self, cancel: &CancellationToken) -> Result<ClientsResponse, HaloError> {
        list_envelope(&self.core, PATH, cancel).await
    }

    /// Gets one record by id.
    pub async fn get(&self, id: i64, cancel: &CancellationToken) -> Result<Client, HaloError> {
        get_by_id(&self.core, PATH, "Client", id, cancel).await
    }
}
