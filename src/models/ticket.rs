//! Ticket models for the Halo `/api/Tickets` endpoint.
//!
//! Halo field names are kept as the API spells them (`tickettype_id`,
//! `dateoccurred`, ...) so the structs deserialize without renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{deserialize_halo_datetime, CustomField, Envelope};

/// A Halo ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket number.
    #[serde(default)]
    pub id: i64,

    /// One-line summary.
    #[serde(default)]
    pub summary: Option<String>,

    /// Full description, only present when details were requested.
    #[serde(default)]
    pub details: Option<String>,

    /// Status identifier.
    #[serde(default)]
    pub status_id: Option<i64>,

    /// Priority identifier.
    #[serde(default)]
    pub priority_id: Option<i64>,

    /// Ticket type identifier.
    #[serde(default)]
    pub tickettype_id: Option<i64>,

    /// Customer the ticket belongs to.
    #[serde(default)]
    pub client_id: Option<i64>,

    /// Customer name.
    #[serde(default)]
    pub client_name: Option<String>,

    /// Customer site.
    #[serde(default)]
    pub site_id: Option<i64>,

    /// Customer site name.
    #[serde(default)]
    pub site_name: Option<String>,

    /// End user who raised the ticket.
    #[serde(default)]
    pub user_id: Option<i64>,

    /// End user name.
    #[serde(default)]
    pub user_name: Option<String>,

    /// Assigned agent.
    #[serde(default)]
    pub agent_id: Option<i64>,

    /// Assigned team name.
    #[serde(default)]
    pub team: Option<String>,

    /// First-level category.
    #[serde(default)]
    pub category_1: Option<String>,

    /// When the issue occurred.
    #[serde(default, deserialize_with = "deserialize_halo_datetime")]
    pub dateoccurred: Option<DateTime<Utc>>,

    /// Last action on the ticket.
    #[serde(default, deserialize_with = "deserialize_halo_datetime")]
    pub lastactiondate: Option<DateTime<Utc>>,

    /// When the ticket was closed. Unset while open.
    #[serde(default, deserialize_with = "deserialize_halo_datetime")]
    pub dateclosed: Option<DateTime<Utc>>,

    /// On hold flag.
    #[serde(default)]
    pub onhold: Option<bool>,

    /// Custom field values, present when requested.
    #[serde(default)]
    pub customfields: Vec<CustomField>,
}

impl Ticket {
    /// A ticket is closed once it has a close date.
    pub fn is_closed(&self) -> bool {
        self.dateclosed.is_some()
    }

    /// True when the ticket is on hold.
    pub fn is_on_hold(&self) -> bool {
        self.onhold.unwrap_or(false)
    }

    /// Returns the summary or a placeholder.
    pub fn display_summary(&self) -> &str {
        self.summary.as_deref().unwrap_or("(no summary)")
    }

    /// Returns the customer name or a placeholder.
    pub fn display_client(&self) -> &str {
        self.client_name.as_deref().unwrap_or("Unknown")
    }
}

/// Envelope returned by `GET /api/Tickets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketsResponse {
    /// Tickets on this page.
    #[serde(default)]
    pub tickets: Vec<Ticket>,

    /// Total matching tickets.
    #[serde(default)]
    pub record_count: i64,

    /// Page number, when paginated.
    #[serde(default)]
    pub page_no: Option<u32>,

    /// Page size, when paginated.
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Number of pages, when the server reports it.
    #[serde(default)]
    pub page_count: Option<u32>,
}

impl TicketsResponse {
    /// True when the response is one page of a larger result.
    pub fn is_paginated(&self) -> bool {
        self.page_no.is_some()
    }

    /// True when more tickets exist beyond this page.
    pub fn has_more(&self) -> bool {
        match (self.page_no, self.page_size) {
            (Some(no), Some(size)) => i64::from(no) * i64::from(size) < self.record_count,
            _ => (self.tickets.len() as i64) < self.record_count,
        }
    }
}

impl Envelope for TicketsResponse {
    type Item = Ticket;

    fn record_count(&self) -> i64 {
        self.record_count
    }

    fn into_items(self) -> Vec<Ticket> {
        self.tickets
    }
}

/// Query parameters for listing tickets.
///
/// Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketFilter {
    /// Maximum tickets to return when not paginating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// Page to return, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_no: Option<u32>,

    /// Tickets per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// Turns pagination on. Halo spells the parameter `pageinate`.
    #[serde(rename = "pageinate", skip_serializing_if = "Option::is_none")]
    pub paginate: Option<bool>,

    /// Status identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,

    /// Priority identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<i64>,

    /// Customer identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,

    /// Site identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<i64>,

    /// End user identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Agent identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,

    /// Team identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,

    /// Category identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    /// Ticket type identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickettype_id: Option<i64>,

    /// Asset identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<i64>,

    /// Service identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<i64>,

    /// Free-text search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Tickets raised on or after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startdate: Option<DateTime<Utc>>,

    /// Tickets raised on or before this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enddate: Option<DateTime<Utc>>,

    /// Only open tickets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_only: Option<bool>,

    /// Only closed tickets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_only: Option<bool>,

    /// Only tickets assigned to the authenticated agent.
    #[serde(rename = "mine", skip_serializing_if = "Option::is_none")]
    pub my_tickets: Option<bool>,

    /// Include ticket details in list results.
    #[serde(rename = "includedetails", skip_serializing_if = "Option::is_none")]
    pub include_details: Option<bool>,

    /// Comma-separated custom field ids to include.
    #[serde(rename = "includecustomfields", skip_serializing_if = "Option::is_none")]
    pub include_custom_fields: Option<String>,

    /// Field to order by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    /// Order descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderdesc: Option<bool>,
}

impl TicketFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of tickets returned.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Requests one page of results.
    pub fn with_page(mut self, page_no: u32, page_size: u32) -> Self {
        self.paginate = Some(true);
        self.page_no = Some(page_no);
        self.page_size = Some(page_size);
        self
    }

    /// Filters by customer.
    pub fn with_client(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Filters by assigned agent.
    pub fn with_agent(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    /// Filters by status.
    pub fn with_status(mut self, status_id: i64) -> Self {
        self.status_id = Some(status_id);
        self
    }

    /// Filters by ticket type.
    pub fn with_ticket_type(mut self, tickettype_id: i64) -> Self {
        self.tickettype_id = Some(tickettype_id);
        self
    }

    /// Free-text search.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Restricts to tickets raised in a time window.
    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.startdate = Some(start);
        self.enddate = Some(end);
        self
    }

    /// Only open tickets.
    pub fn open_only(mut self) -> Self {
        self.open_only = Some(true);
        self.closed_only = None;
        self
    }

    /// Only closed tickets.
    pub fn closed_only(mut self) -> Self {
        self.closed_only = Some(true);
        self.open_only = None;
        self
    }

    /// Includes ticket details in the results.
    pub fn with_details(mut self) -> Self {
        self.include_details = Some(true);
        self
    }

    /// Orders the results by a field.
    pub fn with_order(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order = Some(field.into());
        self.orderdesc = Some(descending);
        self
    }
}

/// Body for creating a ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateTicketRequest {
    /// One-line summary.
    pub summary: String,

    /// Full description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Ticket type identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickettype_id: Option<i64>,

    /// Customer identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,

    /// Site identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<i64>,

    /// End user identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Priority identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<i64>,

    /// Initial status identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,

    /// Agent to assign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,

    /// Team to assign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// First-level category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_1: Option<String>,

    /// Custom field values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customfields: Vec<CustomField>,
}

impl CreateTicketRequest {
    /// Creates a request with only a summary.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Sets the customer.
    pub fn with_client(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the end user.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the ticket type.
    pub fn with_ticket_type(mut self, tickettype_id: i64) -> Self {
        self.tickettype_id = Some(tickettype_id);
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority_id: i64) -> Self {
        self.priority_id = Some(priority_id);
        self
    }

    /// Adds a custom field value.
    pub fn with_custom_field(mut self, field: CustomField) -> Self {
        self.customfields.push(field);
        self
    }
}

/// Body for updating a ticket. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateTicketRequest {
    /// New summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,

    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<i64>,

    /// New ticket type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickettype_id: Option<i64>,

    /// New assignee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,

    /// New team.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// Custom field values to change.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customfields: Vec<CustomField>,
}

impl UpdateTicketRequest {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Changes the description.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Changes the status.
    pub fn with_status(mut self, status_id: i64) -> Self {
        self.status_id = Some(status_id);
        self
    }

    /// Changes the priority.
    pub fn with_priority(mut self, priority_id: i64) -> Self {
        self.priority_id = Some(priority_id);
        self
    }

    /// Reassigns the ticket.
    pub fn with_agent(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    /// True when nothing would be changed.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_ticket_deserializes_halo_shape() {
        let ticket: Ticket = serde_json::from_value(json!({
            "id": 1042,
            "summary": "Printer on fire",
            "status_id": 1,
            "client_id": 12,
            "client_name": "Acme Ltd",
            "dateoccurred": "2024-03-01T10:15:00",
            "dateclosed": "1900-01-01T00:00:00",
            "onhold": false,
            "some_field_we_ignore": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(ticket.id, 1042);
        assert_eq!(ticket.display_summary(), "Printer on fire");
        assert_eq!(ticket.display_client(), "Acme Ltd");
        assert!(ticket.dateoccurred.is_some());
        assert!(!ticket.is_closed());
        assert!(!ticket.is_on_hold());
    }

    #[test]
    fn test_ticket_closed_when_close_date_set() {
        let ticket: Ticket = serde_json::from_value(json!({
            "id": 7,
            "dateclosed": "2024-03-02T08:00:00Z"
        }))
        .unwrap();
        assert!(ticket.is_closed());
        assert_eq!(ticket.display_summary(), "(no summary)");
    }

    #[test]
    fn test_tickets_response_pagination() {
        let page: TicketsResponse = serde_json::from_value(json!({
            "tickets": [{"id": 1}, {"id": 2}],
            "record_count": 100,
            "page_no": 1,
            "page_size": 2
        }))
        .unwrap();
        assert!(page.is_paginated());
        assert!(page.has_more());

        let last: TicketsResponse = serde_json::from_value(json!({
            "tickets": [{"id": 1}],
            "record_count": 1
        }))
        .unwrap();
        assert!(!last.is_paginated());
        assert!(!last.has_more());
        assert_eq!(last.into_items().len(), 1);
    }

    #[test]
    fn test_filter_serializes_only_set_fields() {
        let filter = TicketFilter::new()
            .with_page(2, 25)
            .with_client(12)
            .open_only()
            .with_order("dateoccurred", true);

        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "page_no": 2,
                "page_size": 25,
                "pageinate": true,
                "client_id": 12,
                "open_only": true,
                "order": "dateoccurred",
                "orderdesc": true
            })
        );
    }

    #[test]
    fn test_open_and_closed_only_are_exclusive() {
        let filter = TicketFilter::new().open_only().closed_only();
        assert_eq!(filter.open_only, None);
        assert_eq!(filter.closed_only, Some(true));
    }

    #[test]
    fn test_create_request_body() {
        let request = CreateTicketRequest::new("New laptop")
            .with_client(12)
            .with_user(40)
            .with_priority(3)
            .with_custom_field(CustomField::new(5, "SN-123"));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "summary": "New laptop",
                "client_id": 12,
                "user_id": 40,
                "priority_id": 3,
                "customfields": [{"id": 5, "value": "SN-123"}]
            })
        );
    }

    #[test]
    fn test_update_request_empty() {
        assert!(UpdateTicketRequest::new().is_empty());
        assert!(!UpdateTicketRequest::new().with_status(9).is_empty());
    }
}
