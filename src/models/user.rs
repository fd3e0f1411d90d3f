//! End user models for `/api/Users`.

use serde::{Deserialize, Serialize};

use super::common::Envelope;

/// An end user belonging to a customer site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    #[serde(default)]
    pub id: i64,

    /// Full name.
    #[serde(default)]
    pub name: Option<String>,

    /// Email address.
    #[serde(default)]
    pub emailaddress: Option<String>,

    /// Phone number.
    #[serde(default)]
    pub phonenumber: Option<String>,

    /// Customer identifier.
    #[serde(default)]
    pub client_id: Option<i64>,

    /// Customer name.
    #[serde(default)]
    pub client_name: Option<String>,

    /// Site identifier.
    #[serde(default)]
    pub site_id: Option<i64>,

    /// Site name.
    #[serde(default)]
    pub site_name: Option<String>,

    /// Disabled user.
    #[serde(default)]
    pub inactive: Option<bool>,
}

impl User {
    /// Returns the name, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.emailaddress.as_deref())
            .unwrap_or("Unknown")
    }
}

/// Envelope returned by `GET /api/Users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersResponse {
    /// Users in this response.
    #[serde(default)]
    pub users: Vec<User>,

    /// Total matching users.
    #[serde(default)]
    pub record_count: i64,
}

impl Envelope for UsersResponse {
    type Item = User;

    fn record_count(&self) -> i64 {
        self.record_count
    }

    fn into_items(self) -> Vec<User> {
        self.users
    }
}
