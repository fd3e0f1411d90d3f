use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{get_by_id, list_envelope};
use crate::client::ClientCore;
use crate::error::HaloError;
use crate::models::{Asset, AssetsResponse};

const PATH: &str = "/api/Asset";

/// Assets, served as an envelope with a record count.
#[derive(Clone)]
pub struct AssetsApi {
    core: Arc<ClientCore>,
}

impl AssetsApi {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Lists assets, unwrapped from the envelope.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Asset>, HaloError> {
        Ok(self.list_response(cancel).await?.assets)
    }

    /// Lists assets with the envelope intact.
    pub async fn list_response(&self, cancel: &CancellationToken) -> Result<AssetsResponse, HaloError> {
        list_envelope(&self.core, PATH, cancel).await
    }

    /// Gets an asset by id.
    pub async fn get(&self, id: i64, cancel: &CancellationToken) -> Result<Asset, HaloError> {
        get_by_id(&self.core, PATH, "Asset", id, cancel).await
    }
}
