use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{get_by_id, list_envelope};
use crate::client::ClientCore;
use crate::error::HaloError;
use crate::models::{Project, ProjectsResponse};

const PATH: &str = "/api/Projects";

/// Projects.
///
/// Halo stores projects as tickets of a project type, but serves them from
/// their own endpoint with a `projects` envelope.
#[derive(Clone)]
pub struct ProjectsApi {
    core: Arc<ClientCore>,
}

impl ProjectsApi {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Lists projects, unwrapped from the envelope.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Project>, HaloError> {
        Ok(self.list_response(cancel).await?.projects)
    }

    /// Lists projects with the envelope intact.
    pub async fn list_response(&self, cancel: &CancellationToken) -> Result<ProjectsResponse, HaloError> {
        list_envelope(&self.core, PATH, cancel).await
    }

    /// Gets one record by id.
    pub async fn get(&self, id: i64, cancel: &CancellationToken) -> Result<Project, HaloError> {
        get_by_id(&self.core, PATH, "Project", id, cancel).await
    }
}
