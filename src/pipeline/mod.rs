//! The request pipeline.
//!
//! Every API call travels through a fixed chain of stages before it reaches
//! the network:
//!
//! ```text
//! LoggingStage -> RetryStage -> AuthenticationStage -> Transport
//! ```
//!
//! Each [`Stage`] receives the request and a [`Next`] cursor over the rest of
//! the chain. A stage may inspect or modify the request, call `next.run()`
//! zero or more times, and inspect the outcome on the way back. The chain is
//! composed once, when the client is built.
//!
//! Responses flow back as raw [`ApiResponse`] values whatever their status.
//! The facade turns non-success responses into [`ApiError`](crate::ApiError)
//! values with [`classify`], the same table the retry stage consults through
//! [`is_retryable_status`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::HaloError;

mod auth;
mod classify;
mod logging;
mod retry;
mod transport;

pub use auth::AuthenticationStage;
pub use classify::{classify, is_retryable_status};
pub use logging::LoggingStage;
pub use retry::{RetryPolicy, RetryStage};
pub use transport::{ReqwestTransport, Transport};

/// The resource a call is about, used to enrich not-found errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Resource type, e.g. `Ticket`.
    pub resource_type: String,
    /// Identifier as used in the request path.
    pub resource_id: String,
}

impl ResourceRef {
    /// Creates a resource reference.
    pub fn new(resource_type: impl Into<String>, resource_id: impl ToString) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.to_string(),
        }
    }
}

/// Per-call metadata carried alongside the request.
///
/// Created when a call enters the pipeline and dropped once its response
/// has been handled.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: String,
    started_at: Instant,
    resource: Option<ResourceRef>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates a context with a fresh correlation id.
    pub fn new(cancellation: CancellationToken) -> Self {
        let mut correlation_id = uuid::Uuid::new_v4().simple().to_string();
        correlation_id.truncate(8);
        Self {
            correlation_id,
            started_at: Instant::now(),
            resource: None,
            cancellation,
        }
    }

    /// Attaches the resource this call targets.
    pub fn with_resource(mut self, resource: Option<ResourceRef>) -> Self {
        self.resource = resource;
        self
    }

    /// Short id used to correlate log lines of one call.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Time since the call entered the pipeline.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The resource this call targets, if known.
    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    /// The caller's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// An outgoing request. Cloned for every attempt the retry stage makes.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL.
    pub url: Url,
    /// Request headers. Stages may add to these.
    pub headers: HeaderMap,
    /// Encoded request body.
    pub body: Option<String>,
    /// Per-call metadata.
    pub context: RequestContext,
}

impl ApiRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: Url, context: RequestContext) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            context,
        }
    }
}

/// A response as received from the transport, whatever its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    url: Url,
}

impl ApiResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>, url: Url) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            url,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical reason phrase for the status.
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// URL the response came from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HaloError> {
        serde_json::from_str(&self.body).map_err(HaloError::Serialization)
    }
}

/// One link in the request chain.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Handles a request, delegating to `next` for the rest of the chain.
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HaloError>;
}

/// The remainder of the chain after the current stage.
///
/// `Next` is `Copy`, so a stage can run the rest of the chain more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    transport: &'a dyn Transport,
}

impl Next<'_> {
    /// Runs the remaining stages and finally the transport.
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, HaloError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    transport: self.transport,
                };
                stage.handle(request, next).await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// A composed chain of stages ending in a transport.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Creates a pipeline that sends requests straight to `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            stages: Vec::new(),
            transport,
        }
    }

    /// Appends a stage. Stages added first run outermost.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Sends a request through every stage.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, HaloError> {
        let next = Next {
            stages: &self.stages,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for pipeline tests.

    use std::sync::Mutex;

    use super::*;

    type Handler = dyn Fn(&ApiRequest, usize) -> Result<ApiResponse, HaloError> + Send + Sync;

    /// A transport that answers from a closure and records what it saw.
    pub(crate) struct ScriptedTransport {
        handler: Box<Handler>,
        seen: Mutex<Vec<(ApiRequest, tokio::time::Instant)>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            handler: impl Fn(&ApiRequest, usize) -> Result<ApiResponse, HaloError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                handler: Box::new(handler),
                seen: Mutex::new(Vec::new()),
            })
        }

        /// Always answers with the given status and body.
        pub(crate) fn always(status: u16, body: &'static str) -> Arc<Self> {
            Self::new(move |req, _| Ok(response(req, status, body)))
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.seen.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
        }

        pub(crate) fn instants(&self) -> Vec<tokio::time::Instant> {
            self.seen.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }

        pub(crate) fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HaloError> {
            let index = {
                let mut seen = self.seen.lock().unwrap();
                seen.push((request.clone(), tokio::time::Instant::now()));
                seen.len() - 1
            };
            (self.handler)(&request, index)
        }
    }

    pub(crate) fn response(request: &ApiRequest, status: u16, body: &str) -> ApiResponse {
        ApiResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body,
            request.url.clone(),
        )
    }

    pub(crate) fn get(url: &str) -> ApiRequest {
        ApiRequest::new(
            Method::GET,
            Url::parse(url).unwrap(),
            RequestContext::new(CancellationToken::new()),
        )
    }
}
