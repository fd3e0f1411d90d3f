//! Project models for `/api/Projects`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{deserialize_halo_datetime, Envelope};

/// A project. Halo stores projects as a kind of ticket, so the fields
/// mirror [`Ticket`](super::Ticket).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    #[serde(default)]
    pub id: i64,

    /// Project name.
    #[serde(default)]
    pub summary: Option<String>,

    /// Description.
    #[serde(default)]
    pub details: Option<String>,

    /// Customer identifier.
    #[serde(default)]
    pub client_id: Option<i64>,

    /// Customer name.
    #[serde(default)]
    pub client_name: Option<String>,

    /// Status identifier.
    #[serde(default)]
    pub status_id: Option<i64>,

    /// Project manager.
    #[serde(default)]
    pub agent_id: Option<i64>,

    /// Start date.
    #[serde(default, deserialize_with = "deserialize_halo_datetime")]
    pub startdate: Option<DateTime<Utc>>,

    /// Target completion date.
    #[serde(default, deserialize_with = "deserialize_halo_datetime")]
    pub targetdate: Option<DateTime<Utc>>,

    /// Completion date.
    #[serde(default, deserialize_with = "deserialize_halo_datetime")]
    pub dateclosed: Option<DateTime<Utc>>,
}

impl Project {
    /// A project is complete once it has a close date.
    pub fn is_closed(&self) -> bool {
        self.dateclosed.is_some()
    }

    /// Returns the name or a placeholder.
    pub fn display_name(&self) -> &str {
        self.summary.as_deref().unwrap_or("(unnamed project)")
    }
}

/// Envelope returned by `GET /api/Projects`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectsResponse {
    /// Projects in this response.
    #[serde(default)]
    pub projects: Vec<Project>,

    /// Total matching projects.
    #[serde(default)]
    pub record_count: i64,
}

impl Envelope for ProjectsResponse {
    type Item = Project;

    fn record_count(&self) -> i64 {
        self.record_count
    }

    fn into_items(self) -> Vec<Project> {
        self.projects
    }
}
