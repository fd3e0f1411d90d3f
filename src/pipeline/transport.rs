//! The network end of the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use url::Url;

use super::{classify, ApiRequest, ApiResponse, ResourceRef};
use crate::config::HaloClientOptions;
use crate::error::{ApiError, HaloError};

const USER_AGENT: &str = concat!("halo-api/", env!("CARGO_PKG_VERSION"));

/// Sends a fully prepared request and returns whatever the server answered.
///
/// Implementations must race the request's cancellation token and report
/// [`HaloError::Cancelled`] when it fires first.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one HTTP exchange.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HaloError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Builds the HTTP client with the configured timeout and default headers.
    ///
    /// # Errors
    ///
    /// Returns [`HaloError::Validation`] for an unusable default header and
    /// [`HaloError::HttpClient`] if the client cannot be initialized.
    pub fn new(options: &HaloClientOptions) -> Result<Self, HaloError> {
        let mut headers = HeaderMap::new();
        for (name, value) in options.default_headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HaloError::validation(format!("invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| HaloError::validation(format!("invalid value for header '{}'", name)))?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(options.request_timeout())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(HaloError::HttpClient)?;

        Ok(Self {
            http,
            timeout: options.request_timeout(),
        })
    }

    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, HaloError> {
        let method = request.method.clone();
        let resource = request.context.resource().cloned();
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e, &request.url))?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Err(self.map_body_error(e, status, headers, url, &method, resource.as_ref()))
            }
        };

        Ok(ApiResponse::new(status, headers, body, url))
    }

    fn map_send_error(&self, e: reqwest::Error, url: &Url) -> HaloError {
        if e.is_timeout() {
            HaloError::timeout(self.timeout, url.path())
        } else {
            HaloError::Http(e)
        }
    }

    /// The server answered but its body could not be read. The status still
    /// decides the error kind.
    fn map_body_error(
        &self,
        e: reqwest::Error,
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        method: &Method,
        resource: Option<&ResourceRef>,
    ) -> HaloError {
        if e.is_timeout() {
            return HaloError::timeout(self.timeout, url.path());
        }
        tracing::warn!(status = status.as_u16(), url = %url, error = %e, "Failed to read response body");

        let error = if status.is_success() {
            ApiError::generic(format!("Failed to read response body: {}", e))
                .with_status(status.as_u16())
                .with_request(method.as_str(), url.as_str())
        } else {
            classify(&ApiResponse::new(status, headers, "", url), method, resource)
        };
        error.with_source(e).into()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HaloError> {
        let cancellation = request.context.cancellation().clone();
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(HaloError::Cancelled),
            outcome = self.exchange(request) => outcome,
        }
    }
}
