//! Types shared across Halo models.
//!
//! Halo returns some lists as bare arrays and others wrapped in an envelope
//! with a record count and pagination fields. [`Envelope`] lets the resource
//! layer unwrap any of the envelopes the same way.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A list response wrapped in an envelope object.
pub trait Envelope: DeserializeOwned {
    /// The record type carried by the envelope.
    type Item;

    /// Total number of matching records on the server.
    fn record_count(&self) -> i64;

    /// Consumes the envelope, returning its records.
    fn into_items(self) -> Vec<Self::Item>;
}

/// A custom field value attached to a ticket or asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    /// Field identifier.
    #[serde(default)]
    pub id: i64,

    /// Internal field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Label shown in the Halo UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Raw value. Its JSON type depends on the field type.
    #[serde(default)]
    pub value: serde_json::Value,

    /// Display text for the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl CustomField {
    /// Creates a custom field assignment for create/update requests.
    pub fn new(id: i64, value: impl Into<serde_json::Value>) -> Self {
        Self {
            id,
            name: None,
            label: None,
            value: value.into(),
            display: None,
        }
    }
}

/// Deserializes a Halo timestamp.
///
/// Halo sends RFC 3339 timestamps, timestamps without an offset (UTC), and
/// `1900-01-01T00:00:00` for dates that were never set. The last one becomes
/// `None`.
pub(crate) fn deserialize_halo_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };

    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid Halo timestamp '{}': {}", raw, e)))?;

    if parsed.year() <= 1900 {
        return Ok(None);
    }
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Stamp {
        #[serde(default, deserialize_with = "deserialize_halo_datetime")]
        at: Option<DateTime<Utc>>,
    }

    fn stamp(json: &str) -> Option<DateTime<Utc>> {
        serde_json::from_str::<Stamp>(json).unwrap().at
    }

    #[test]
    fn test_halo_datetime_formats() {
        let with_offset = stamp(r#"{"at":"2024-03-01T10:15:00Z"}"#).unwrap();
        let naive = stamp(r#"{"at":"2024-03-01T10:15:00.123"}"#).unwrap();

        assert_eq!(with_offset.timestamp(), 1_709_288_100);
        assert_eq!(naive.timestamp(), 1_709_288_100);
    }

    #[test]
    fn test_halo_unset_dates_are_none() {
        assert_eq!(stamp(r#"{"at":"1900-01-01T00:00:00"}"#), None);
        assert_eq!(stamp(r#"{"at":null}"#), None);
        assert_eq!(stamp(r#"{"at":""}"#), None);
        assert_eq!(stamp(r#"{}"#), None);
    }

    #[test]
    fn test_halo_datetime_rejects_garbage() {
        assert!(serde_json::from_str::<Stamp>(r#"{"at":"yesterday"}"#).is_err());
    }

    #[test]
    fn test_custom_field_new() {
        let field = CustomField::new(12, "blue");
        assert_eq!(field.id, 12);
        assert_eq!(field.value, serde_json::Value::String("blue".into()));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json, serde_json::json!({"id": 12, "value": "blue"}));
    }
}
