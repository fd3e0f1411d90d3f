//! End-to-end tests of the client against a mock Halo server.
//!
//! These cover the full chain (logging, retry, authentication, transport)
//! over real HTTP:
//! - token exchange and bearer injection
//! - retry behaviour for 5xx, 429, and terminal 4xx responses
//! - error classification for each status family
//! - per-resource response shapes
//! - cancellation and disposal

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use halo_api::{
    ApiErrorKind, CancellationToken, CreateTicketRequest, HaloClient, HaloClientOptions, HaloError,
    TicketFilter, UpdateTicketRequest,
};

// ============================================================================
// Test Helpers
// ============================================================================

const CLIENT_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
const CLIENT_SECRET: &str =
    "550e8400-e29b-41d4-a716-446655440000-123e4567-e89b-12d3-a456-426614174000";

fn options(server: &MockServer) -> HaloClientOptions {
    HaloClientOptions::new("acme", CLIENT_ID, CLIENT_SECRET)
        .with_base_url(server.uri())
        .with_retry_delay(Duration::from_millis(10))
        .with_max_retry_delay(Duration::from_millis(40))
}

fn client(server: &MockServer) -> HaloClient {
    HaloClient::new(options(server)).unwrap()
}

async fn mount_token(server: &MockServer, expected_exchanges: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("scope=all"))
        .and(body_string_contains(CLIENT_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(expected_exchanges)
        .mount(server)
        .await;
}

fn api_kind(err: &HaloError) -> &ApiErrorKind {
    err.api_error()
        .unwrap_or_else(|| panic!("expected an API error, got {err:?}"))
        .kind()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_token_fetched_once_and_sent_as_bearer() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/TicketType"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Incident"},
            {"id": 2, "name": "Service Request"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();

    let first = client.psa().ticket_types().list(&cancel).await.unwrap();
    let second = client.psa().ticket_types().list(&cancel).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].display_name(), "Incident");
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn test_failed_token_exchange_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "The client credentials are invalid"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/TicketType"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .psa()
        .ticket_types()
        .list(&CancellationToken::new())
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert_eq!(api.kind(), &ApiErrorKind::Authentication);
    assert_eq!(api.status_code(), Some(401));
    assert_eq!(api.error_code(), Some("invalid_client"));
    assert!(!err.to_string().contains(CLIENT_SECRET));
}

#[tokio::test]
async fn test_unauthorized_response_forces_new_token() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/Users"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": [], "record_count": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();

    let err = client.psa().users().list(&cancel).await.unwrap_err();
    assert_eq!(api_kind(&err), &ApiErrorKind::Authentication);

    let users = client.psa().users().list(&cancel).await.unwrap();
    assert!(users.is_empty());
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_server_error_attempted_retries_plus_one() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/TicketType"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(4)
        .mount(&server)
        .await;

    let err = client(&server)
        .psa()
        .ticket_types()
        .list(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(api_kind(&err), &ApiErrorKind::Server);
    assert_eq!(err.status_code(), Some(503));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [{"id": 9, "inventory_number": "LT-0042"}],
            "record_count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let assets = client(&server)
        .psa()
        .assets()
        .list(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].display_name(), "LT-0042");
}

#[tokio::test]
async fn test_bad_request_not_retried() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/Tickets"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Validation failed",
            "errors": ["Summary is required", "Client is not valid"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .psa()
        .tickets()
        .create(
            &CreateTicketRequest::new("").with_client(-1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert_eq!(api.status_code(), Some(400));
    assert_eq!(api.message(), "Validation failed");
    assert_eq!(
        api.validation_errors(),
        ["Summary is required", "Client is not valid"]
    );
    assert_eq!(api.request_method(), Some("POST"));
}

#[tokio::test]
async fn test_not_found_not_retried_and_names_resource() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Tickets/42"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .psa()
        .tickets()
        .get(42, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        api_kind(&err),
        &ApiErrorKind::NotFound {
            resource_type: Some("Ticket".to_string()),
            resource_id: Some("42".to_string()),
        }
    );
    assert!(err
        .api_error()
        .and_then(|e| e.request_url())
        .is_some_and(|url| url.contains("/api/Tickets/42")));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Client"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "900")
                .insert_header("X-RateLimit-Limit", "700")
                .insert_header("X-RateLimit-Remaining", "0"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = HaloClient::new(options(&server).with_max_retry_attempts(1)).unwrap();
    let err = client
        .psa()
        .clients()
        .list(&CancellationToken::new())
        .await
        .unwrap_err();

    match api_kind(&err) {
        ApiErrorKind::RateLimit {
            retry_after_seconds,
            rate_limit,
            remaining_requests,
            ..
        } => {
            assert_eq!(*retry_after_seconds, Some(900));
            assert_eq!(*rate_limit, Some(700));
            assert_eq!(*remaining_requests, Some(0));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(err.api_error().unwrap().retry_after(), Some(Duration::from_secs(900)));
}

#[tokio::test]
async fn test_forbidden_is_authorization_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Projects"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .psa()
        .projects()
        .list(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(api_kind(&err), &ApiErrorKind::Authorization);
}

// ============================================================================
// Resources
// ============================================================================

#[tokio::test]
async fn test_ticket_list_sends_filter_and_reads_envelope() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Tickets"))
        .and(query_param("pageinate", "true"))
        .and(query_param("page_no", "1"))
        .and(query_param("page_size", "2"))
        .and(query_param("client_id", "12"))
        .and(query_param("open_only", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tickets": [
                {"id": 1, "summary": "Printer on fire", "client_name": "Acme Ltd"},
                {"id": 2, "summary": "VPN down", "dateclosed": "1900-01-01T00:00:00"}
            ],
            "record_count": 5,
            "page_no": 1,
            "page_size": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = TicketFilter::new().with_page(1, 2).with_client(12).open_only();
    let page = client(&server)
        .psa()
        .tickets()
        .list(&filter, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.tickets.len(), 2);
    assert_eq!(page.record_count, 5);
    assert!(page.has_more());
    assert!(page.tickets.iter().all(|t| !t.is_closed()));
}

#[tokio::test]
async fn test_ticket_update_posts_array_with_id() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/Tickets"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!([{"id": 42, "summary": "Renamed", "status_id": 9}])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "summary": "Renamed",
            "status_id": 9,
            "dateclosed": "2024-03-02T08:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ticket = client(&server)
        .psa()
        .tickets()
        .update(
            42,
            &UpdateTicketRequest::new().with_summary("Renamed").with_status(9),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(ticket.id, 42);
    assert!(ticket.is_closed());
}

#[tokio::test]
async fn test_ticket_delete() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("DELETE"))
        .and(path("/api/Tickets/42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(
        client(&server)
            .psa()
            .tickets()
            .delete(42, &CancellationToken::new())
            .await
    );
}

#[tokio::test]
async fn test_users_envelope_and_get() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"id": 1, "name": "Ana"}, {"id": 2, "emailaddress": "bo@acme.test"}],
            "record_count": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Users/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "name": "Bo"})))
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();

    let response = client.psa().users().list_response(&cancel).await.unwrap();
    assert_eq!(response.record_count, 2);
    assert_eq!(response.users[1].display_name(), "bo@acme.test");

    let user = client.psa().users().get(2, &cancel).await.unwrap();
    assert_eq!(user.display_name(), "Bo");
}

#[tokio::test]
async fn test_default_headers_sent() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/TicketType"))
        .and(header("x-tenant", "north"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = HaloClient::new(options(&server).with_default_header("X-Tenant", "north")).unwrap();
    let types = assert_ok!(client.psa().ticket_types().list(&CancellationToken::new()).await);
    assert!(types.is_empty());
}

// ============================================================================
// Cancellation and lifecycle
// ============================================================================

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/TicketType"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client.psa().ticket_types().list(&cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(!err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_disposed_client_sends_nothing() {
    let server = MockServer::start().await;

    let client = client(&server);
    let tickets = client.psa().tickets();
    assert!(client.dispose());
    assert!(!client.dispose());

    let err = assert_err!(tickets.get(1, &CancellationToken::new()).await);

    assert!(matches!(err, HaloError::Disposed));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_reports_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .test_connection(&CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        HaloError::ConnectionTest { message } => {
            assert!(message.contains("HALO_CLIENT_ID"), "{message}");
            assert!(!message.contains(CLIENT_SECRET));
        }
        other => panic!("expected connection test error, got {other:?}"),
    }
}

#[test]
fn test_base_url_derived_from_account() {
    let client = HaloClient::new(HaloClientOptions::new("acme", CLIENT_ID, CLIENT_SECRET)).unwrap();
    assert_eq!(client.base_url(), "https://acme.halopsa.com");
}

#[test]
fn test_base_url_override_used_verbatim() {
    let client = HaloClient::new(
        HaloClientOptions::new("acme", CLIENT_ID, CLIENT_SECRET)
            .with_base_url("https://custom.example.com"),
    )
    .unwrap();
    assert_eq!(client.base_url(), "https://custom.example.com");
}
