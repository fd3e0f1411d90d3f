//! Customer models for `/api/Client`.

use serde::{Deserialize, Serialize};

use super::common::Envelope;

/// A customer organisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Client {
    /// Customer identifier.
    #[serde(default)]
    pub id: i64,

    /// Customer name.
    #[serde(default)]
    pub name: Option<String>,

    /// Top level the customer sits under.
    #[serde(default)]
    pub toplevel_id: Option<i64>,

    /// Top level name.
    #[serde(default)]
    pub toplevel_name: Option<String>,

    /// Website.
    #[serde(default)]
    pub website: Option<String>,

    /// Disabled customer.
    #[serde(default)]
    pub inactive: Option<bool>,
}

impl Client {
    /// Returns the name or a placeholder.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Envelope returned by `GET /api/Client`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientsResponse {
    /// Customers in this response.
    #[serde(default)]
    pub clients: Vec<Client>,

    /// Total matching customers.
    #[serde(default)]
    pub record_count: i64,
}

impl Envelope for ClientsResponse {
    type Item = Client;

    fn record_count(&self) -> i64 {
        self.record_count
    }

    fn into_items(self) -> Vec<Client> {
        self.clients
    }
}
