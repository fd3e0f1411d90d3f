//! Ticket type models for `/api/TicketType`.

use serde::{Deserialize, Serialize};

/// A ticket type. `GET /api/TicketType` returns a bare array of these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketType {
    /// Type identifier.
    #[serde(default)]
    pub id: i64,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Group the type belongs to.
    #[serde(default)]
    pub group_id: Option<i64>,

    /// Group name.
    #[serde(default)]
    pub group_name: Option<String>,

    /// Hidden from new tickets.
    #[serde(default)]
    pub inactive: Option<bool>,

    /// Sort position.
    #[serde(default)]
    pub sequence: Option<i64>,
}

impl TicketType {
    /// Returns the name or a placeholder.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// True unless the type is marked inactive.
    pub fn is_active(&self) -> bool {
        !self.inactive.unwrap_or(false)
    }
}
