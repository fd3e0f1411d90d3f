//! Outermost observer. Never changes what passes through it.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};

use super::{ApiRequest, ApiResponse, Next, Stage};
use crate::config::HaloClientOptions;
use crate::error::HaloError;

/// Logs each call, its outcome, and how long it took.
///
/// Request and response lines follow the logging toggles in the options;
/// failures are always logged at ERROR.
#[derive(Debug, Clone)]
pub struct LoggingStage {
    log_requests: bool,
    log_responses: bool,
}

impl LoggingStage {
    /// Creates the stage with explicit toggles.
    pub fn new(log_requests: bool, log_responses: bool) -> Self {
        Self {
            log_requests,
            log_responses,
        }
    }

    /// Reads the toggles from client options.
    pub fn from_options(options: &HaloClientOptions) -> Self {
        Self::new(
            options.enable_request_logging(),
            options.enable_response_logging(),
        )
    }
}

fn loggable_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if *name == AUTHORIZATION || value.is_sensitive() {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{}: {}", name, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Stage for LoggingStage {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HaloError> {
        let request_id = request.context.correlation_id().to_string();
        let method = request.method.clone();
        let uri = request.url.clone();
        let context = request.context.clone();

        if self.log_requests {
            tracing::info!(request_id = %request_id, method = %method, uri = %uri, "HTTP {} {}", method, uri);
            if !request.headers.is_empty() {
                tracing::debug!(request_id = %request_id, headers = %loggable_headers(&request.headers), "Request headers");
            }
        }

        let outcome = next.run(request).await;
        let elapsed_ms = context.elapsed().as_millis() as u64;

        match &outcome {
            Ok(response) if self.log_responses => {
                let status = response.status().as_u16();
                if response.is_success() {
                    tracing::info!(
                        request_id = %request_id,
                        status,
                        elapsed_ms,
                        "HTTP {} {} in {}ms",
                        status,
                        response.reason(),
                        elapsed_ms
                    );
                } else {
                    tracing::warn!(
                        request_id = %request_id,
                        status,
                        elapsed_ms,
                        "HTTP {} {} in {}ms",
                        status,
                        response.reason(),
                        elapsed_ms
                    );
                    if !response.headers().is_empty() {
                        tracing::debug!(request_id = %request_id, headers = %loggable_headers(response.headers()), "Response headers");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    elapsed_ms,
                    error = %e,
                    "HTTP {} {} failed after {}ms",
                    method,
                    uri,
                    elapsed_ms
                );
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::{self, Write};
    use std::sync::{Arc, Mutex};

    use reqwest::header::HeaderValue;
    use reqwest::StatusCode;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::super::testing::{get, response, ScriptedTransport};
    use super::super::Pipeline;
    use super::*;

    const TICKETS: &str = "https://acme.halopsa.com/api/Tickets";

    /// Records every event as its level and rendered fields.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

    impl Captured {
        fn events(&self) -> Vec<(Level, String)> {
            self.0.lock().unwrap().clone()
        }

        fn at(&self, level: Level) -> Vec<String> {
            self.events()
                .into_iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, line)| line)
                .collect()
        }
    }

    struct Fields<'a>(&'a mut String);

    impl Visit for Fields<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }
    }

    impl<S: Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut line = String::new();
            event.record(&mut Fields(&mut line));
            self.0.lock().unwrap().push((*event.metadata().level(), line));
        }
    }

    async fn run(stage: LoggingStage, transport: Arc<ScriptedTransport>, request: ApiRequest) -> Captured {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let _ = Pipeline::new(transport).with_stage(stage).execute(request).await;
        captured
    }

    fn authorized_get() -> ApiRequest {
        let mut request = get(TICKETS);
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret-token"));
        request
            .headers
            .insert("x-tenant", HeaderValue::from_static("north"));
        request
    }

    #[test]
    fn test_authorization_never_rendered() {
        let rendered = loggable_headers(&authorized_get().headers);

        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("authorization: [REDACTED]"));
        assert!(rendered.contains("x-tenant: north"));
    }

    #[tokio::test]
    async fn test_silent_when_toggles_off() {
        let captured = run(
            LoggingStage::new(false, false),
            ScriptedTransport::always(503, "down"),
            get(TICKETS),
        )
        .await;

        assert!(captured.events().is_empty(), "{:?}", captured.events());
    }

    #[tokio::test]
    async fn test_request_line_and_redacted_headers() {
        let captured = run(
            LoggingStage::new(true, false),
            ScriptedTransport::always(200, "[]"),
            authorized_get(),
        )
        .await;

        let info = captured.at(Level::INFO);
        assert_eq!(info.len(), 1);
        assert!(info[0].contains(&format!("HTTP GET {}", TICKETS)), "{}", info[0]);
        assert!(info[0].contains("request_id="));

        let debug = captured.at(Level::DEBUG);
        assert_eq!(debug.len(), 1);
        assert!(debug[0].contains("authorization: [REDACTED]"));
        assert!(captured.events().iter().all(|(_, line)| !line.contains("secret-token")));
    }

    #[tokio::test]
    async fn test_success_response_logged_at_info() {
        let captured = run(
            LoggingStage::new(false, true),
            ScriptedTransport::always(200, "[]"),
            get(TICKETS),
        )
        .await;

        let info = captured.at(Level::INFO);
        assert_eq!(info.len(), 1);
        assert!(info[0].contains("status=200"));
        assert!(info[0].contains("elapsed_ms="));
        assert!(captured.at(Level::WARN).is_empty());
    }

    #[tokio::test]
    async fn test_failure_response_logged_at_warn_with_headers() {
        let transport = ScriptedTransport::new(|req, _| {
            let mut headers = HeaderMap::new();
            headers.insert("retry-after", HeaderValue::from_static("30"));
            headers.insert("set-cookie", {
                let mut value = HeaderValue::from_static("session=abc");
                value.set_sensitive(true);
                value
            });
            Ok(ApiResponse::new(
                StatusCode::SERVICE_UNAVAILABLE,
                headers,
                "down",
                req.url.clone(),
            ))
        });
        let captured = run(LoggingStage::new(false, true), transport, get(TICKETS)).await;

        let warn = captured.at(Level::WARN);
        assert_eq!(warn.len(), 1);
        assert!(warn[0].contains("status=503"));
        assert!(captured.at(Level::INFO).is_empty());

        let debug = captured.at(Level::DEBUG);
        assert_eq!(debug.len(), 1);
        assert!(debug[0].contains("retry-after: 30"));
        assert!(debug[0].contains("set-cookie: [REDACTED]"));
        assert!(!debug[0].contains("session=abc"));
    }

    #[tokio::test]
    async fn test_errors_logged_even_when_toggles_off() {
        let transport = ScriptedTransport::new(|_, _| Err(HaloError::validation("boom")));
        let captured = run(LoggingStage::new(false, false), transport, get(TICKETS)).await;

        let error = captured.at(Level::ERROR);
        assert_eq!(error.len(), 1);
        assert!(error[0].contains("boom"));
        assert!(error[0].contains("elapsed_ms="));
        assert_eq!(captured.events().len(), 1);
    }

    #[tokio::test]
    async fn test_passes_responses_through() {
        let transport = ScriptedTransport::new(|req, _| Ok(response(req, 404, "missing")));
        let pipeline = Pipeline::new(transport).with_stage(LoggingStage::new(true, true));

        let response = pipeline.execute(get("https://acme.halopsa.com/api/Tickets/1")).await.unwrap();

        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(response.body(), "missing");
    }

    #[tokio::test]
    async fn test_passes_errors_through() {
        let transport = ScriptedTransport::new(|_, _| Err(HaloError::Cancelled));
        let pipeline = Pipeline::new(transport).with_stage(LoggingStage::new(false, false));

        let err = pipeline.execute(get(TICKETS)).await.unwrap_err();

        assert!(err.is_cancelled());
    }
}
