//! Turns non-success responses into [`ApiError`] values.
//!
//! | Status | Kind             |
//! |--------|------------------|
//! | 400    | `BadRequest`     |
//! | 401    | `Authentication` |
//! | 403    | `Authorization`  |
//! | 404    | `NotFound`       |
//! | 429    | `RateLimit`      |
//! | 5xx    | `Server`         |
//! | other  | `Generic`        |

use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};

use super::{ApiResponse, ResourceRef};
use crate::error::{ApiError, ApiErrorKind};

/// True for statuses the retry stage may try again: 429 and every 5xx.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Classifies a completed non-success response.
///
/// `resource` names what the call was about and is attached to `NotFound`
/// errors. The raw body is always kept under `details["body"]`.
pub fn classify(response: &ApiResponse, method: &Method, resource: Option<&ResourceRef>) -> ApiError {
    let status = response.status();
    let parsed = match serde_json::from_str::<Value>(response.body()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    let error_code = parsed.as_ref().and_then(error_code);
    let message = parsed
        .as_ref()
        .and_then(message)
        .unwrap_or_else(|| default_message(status, resource));

    let kind = match status {
        StatusCode::BAD_REQUEST => ApiErrorKind::BadRequest {
            validation_errors: parsed.as_ref().map(validation_errors).unwrap_or_default(),
        },
        StatusCode::UNAUTHORIZED => ApiErrorKind::Authentication,
        StatusCode::FORBIDDEN => ApiErrorKind::Authorization,
        StatusCode::NOT_FOUND => ApiErrorKind::NotFound {
            resource_type: resource.map(|r| r.resource_type.clone()),
            resource_id: resource.map(|r| r.resource_id.clone()),
        },
        StatusCode::TOO_MANY_REQUESTS => rate_limit(response, parsed.as_ref()),
        s if s.is_server_error() => ApiErrorKind::Server,
        _ => ApiErrorKind::Generic,
    };

    let mut details = parsed.unwrap_or_default();
    details.insert("body".to_string(), Value::String(response.body().to_string()));

    ApiError::new(kind, message)
        .with_status(status.as_u16())
        .with_error_code(error_code)
        .with_details(Some(details))
        .with_request(method.as_str(), response.url().as_str())
}

fn default_message(status: StatusCode, resource: Option<&ResourceRef>) -> String {
    match status {
        StatusCode::BAD_REQUEST => "The request was rejected as invalid".to_string(),
        StatusCode::UNAUTHORIZED => "Authentication failed".to_string(),
        StatusCode::FORBIDDEN => "Access to the requested resource is forbidden".to_string(),
        StatusCode::NOT_FOUND => match resource {
            Some(r) => format!("{} '{}' was not found", r.resource_type, r.resource_id),
            None => "The requested resource was not found".to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => "Rate limit exceeded".to_string(),
        s if s.is_server_error() => format!(
            "The server failed to process the request ({} {})",
            s.as_u16(),
            s.canonical_reason().unwrap_or("Unknown")
        ),
        s => format!(
            "Request failed with status {} {}",
            s.as_u16(),
            s.canonical_reason().unwrap_or("Unknown")
        ),
    }
}

fn string_field(body: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match body.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn error_code(body: &Map<String, Value>) -> Option<String> {
    string_field(body, &["error", "code", "error_code"])
}

fn message(body: &Map<String, Value>) -> Option<String> {
    string_field(body, &["error_description", "message", "Message", "title"])
}

/// Collects validation messages from the shapes the API is known to use:
/// a list of strings, a list of `{ "message": ... }` objects, or a map of
/// field name to one or more messages.
fn validation_errors(body: &Map<String, Value>) -> Vec<String> {
    match body.get("errors") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => string_field(obj, &["message", "Message", "error"]),
                _ => None,
            })
            .collect(),
        Some(Value::Object(fields)) => fields
            .iter()
            .flat_map(|(field, messages)| {
                let messages: Vec<String> = match messages {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(list) => list
                        .iter()
                        .filter_map(|m| m.as_str().map(str::to_string))
                        .collect(),
                    _ => Vec::new(),
                };
                messages
                    .into_iter()
                    .map(move |m| format!("{}: {}", field, m))
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn rate_limit(response: &ApiResponse, body: Option<&Map<String, Value>>) -> ApiErrorKind {
    let retry_after_seconds = response
        .header("retry-after")
        .and_then(parse_retry_after)
        .or_else(|| body_u64(body, &["retry_after", "retryAfter"]));
    let rate_limit = response
        .header("x-ratelimit-limit")
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| body_u64(body, &["rate_limit", "limit"]));
    let remaining_requests = response
        .header("x-ratelimit-remaining")
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| body_u64(body, &["remaining_requests", "remaining"]));
    let reset_time = response.header("x-ratelimit-reset").and_then(parse_reset);

    ApiErrorKind::RateLimit {
        retry_after_seconds,
        rate_limit,
        remaining_requests,
        reset_time,
    }
}

fn body_u64(body: Option<&Map<String, Value>>, keys: &[&str]) -> Option<u64> {
    let body = body?;
    keys.iter().find_map(|key| body.get(*key).and_then(Value::as_u64))
}

/// `Retry-After` is either delta-seconds or an HTTP date.
fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&Utc) - Utc::now();
    Some(wait.num_seconds().max(0) as u64)
}

/// `X-RateLimit-Reset` is either unix seconds or an RFC 3339 timestamp.
fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Utc.timestamp_opt(seconds, 0).single();
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
