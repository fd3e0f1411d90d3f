//! Asset models for `/api/Asset`.

use serde::{Deserialize, Serialize};

use super::common::{CustomField, Envelope};

/// A configuration item tracked against a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Asset {
    /// Asset identifier.
    #[serde(default)]
    pub id: i64,

    /// Asset tag.
    #[serde(default)]
    pub inventory_number: Option<String>,

    /// Value of the asset type's key field.
    #[serde(default)]
    pub key_field: Option<String>,

    /// Asset type identifier.
    #[serde(default)]
    pub assettype_id: Option<i64>,

    /// Asset type name.
    #[serde(default)]
    pub assettype_name: Option<String>,

    /// Owning customer.
    #[serde(default)]
    pub client_id: Option<i64>,

    /// Owning customer name.
    #[serde(default)]
    pub client_name: Option<String>,

    /// Site identifier.
    #[serde(default)]
    pub site_id: Option<i64>,

    /// Site name.
    #[serde(default)]
    pub site_name: Option<String>,

    /// Retired asset.
    #[serde(default)]
    pub inactive: Option<bool>,

    /// Custom field values.
    #[serde(default)]
    pub customfields: Vec<CustomField>,
}

impl Asset {
    /// Returns the key field, then the asset tag, then a placeholder.
    pub fn display_name(&self) -> &str {
        self.key_field
            .as_deref()
            .or(self.inventory_number.as_deref())
            .unwrap_or("Unknown")
    }
}

/// Envelope returned by `GET /api/Asset`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetsResponse {
    /// Assets in this response.
    #[serde(default)]
    pub assets: Vec<Asset>,

    /// Total matching assets.
    #[serde(default)]
    pub record_count: i64,
}

impl Envelope for AssetsResponse {
    type Item = Asset;

    fn record_count(&self) -> i64 {
        self.record_count
    }

    fn into_items(self) -> Vec<Asset> {
        self.assets
    }
}
