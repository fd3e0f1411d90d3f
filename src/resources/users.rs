use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{get_by_id, list_envelope};
use crate::client::ClientCore;
use crate::error::HaloError;
use crate::models::{User, UsersResponse};

const PATH: &str = "/api/Users";

/// End users, served as an envelope with a record count.
#[derive(Clone)]
pub struct UsersApi {
    core: Arc<ClientCore>,
}

impl UsersApi {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Lists end users, unwrapped from the envelope.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<User>, HaloError> {
        Ok(self.list_response(cancel).await?.users)
    }

    /// Lists end users with the envelope intact.
    pub async fn list_response(&self, cancel: &CancellationToken) -> Result<UsersResponse, HaloError> {
        list_envelope(&self.core, PATH, cancel).await
    }

    /// Gets one record by id.
    pub async fn get(&self, id: i64, cancel: &CancellationToken) -> Result<User, HaloError> {
        get_by_id(&self.core, PATH, "User", id, cancel).await
    }
}
