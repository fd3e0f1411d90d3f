//! The client facade.
//!
//! [`HaloClient`] validates its options, composes the request pipeline once,
//! and hands out resource groups that all share that pipeline:
//!
//! ```text
//! HaloClient::psa() -> PsaApi -> tickets() / ticket_types() / users() / ...
//! ```
//!
//! Disposing the client drops the pipeline (and with it the HTTP connection
//! pool and the cached credential). Calls made afterwards fail with
//! [`HaloError::Disposed`].

use std::sync::{Arc, RwLock};

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::HaloClientOptions;
use crate::error::{ApiErrorKind, ConfigError, HaloError};
use crate::pipeline::{
    classify, ApiRequest, ApiResponse, AuthenticationStage, LoggingStage, Pipeline, RequestContext,
    ResourceRef, ReqwestTransport, RetryPolicy, RetryStage, Transport,
};
use crate::resources::{AssetsApi, ClientsApi, ProjectsApi, TicketTypesApi, TicketsApi, UsersApi};

/// State shared by the facade and every resource group.
pub(crate) struct ClientCore {
    base_url: String,
    pipeline: RwLock<Option<Arc<Pipeline>>>,
}

impl ClientCore {
    fn active_pipeline(&self) -> Result<Arc<Pipeline>, HaloError> {
        self.pipeline
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(HaloError::Disposed)
    }

    fn release(&self) -> bool {
        self.pipeline
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    fn is_released(&self) -> bool {
        self.pipeline
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, HaloError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| HaloError::validation(format!("cannot build request URL '{}': {}", joined, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Sends a request through the pipeline and classifies non-success responses.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<String>,
        resource: Option<ResourceRef>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, HaloError> {
        let pipeline = self.active_pipeline()?;
        if cancel.is_cancelled() {
            return Err(HaloError::Cancelled);
        }

        let url = self.url(path, query)?;
        let context = RequestContext::new(cancel.clone()).with_resource(resource);
        let mut request = ApiRequest::new(method, url, context);
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if body.is_some() {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        request.body = body;

        let method = request.method.clone();
        let resource = request.context.resource().cloned();
        let response = pipeline.execute(request).await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(classify(&response, &method, resource.as_ref()).into())
        }
    }

    /// GETs `path` and deserializes the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        resource: Option<ResourceRef>,
        cancel: &CancellationToken,
    ) -> Result<T, HaloError> {
        self.send(Method::GET, path, query, None, resource, cancel)
            .await?
            .json()
    }

    /// POSTs a JSON body to `path` and deserializes the JSON response.
    pub(crate) async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        resource: Option<ResourceRef>,
        cancel: &CancellationToken,
    ) -> Result<T, HaloError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)?;
        self.send(Method::POST, path, &[], Some(body), resource, cancel)
            .await?
            .json()
    }

    /// DELETEs `path`, ignoring any response body.
    pub(crate) async fn delete(
        &self,
        path: &str,
        resource: Option<ResourceRef>,
        cancel: &CancellationToken,
    ) -> Result<(), HaloError> {
        self.send(Method::DELETE, path, &[], None, resource, cancel)
            .await
            .map(|_| ())
    }
}

/// Flattens a serializable filter into query pairs, skipping nulls.
pub(crate) fn query_pairs<Q: Serialize>(query: &Q) -> Result<Vec<(String, String)>, HaloError> {
    let Value::Object(map) = serde_json::to_value(query)? else {
        return Ok(Vec::new());
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

/// Typed client for the Halo REST API.
///
/// Cheap to share: wrap it in an `Arc` or hand out resource groups, which
/// hold their own reference to the pipeline.
///
/// # Example
///
/// ```ignore
/// use halo_api::{HaloClient, HaloClientOptions, TicketFilter};
/// use tokio_util::sync::CancellationToken;
///
/// async fn example() -> Result<(), halo_api::HaloError> {
///     let client = HaloClient::new(HaloClientOptions::from_env()?)?;
///     let cancel = CancellationToken::new();
///
///     let page = client
///         .psa()
///         .tickets()
///         .list(&TicketFilter::new().open_only().with_count(10), &cancel)
///         .await?;
///     for ticket in &page.tickets {
///         println!("#{} {}", ticket.id, ticket.display_summary());
///     }
///     Ok(())
/// }
/// ```
pub struct HaloClient {
    options: HaloClientOptions,
    core: Arc<ClientCore>,
}

impl HaloClient {
    /// Validates `options` and builds a client that talks to Halo over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`HaloError::Config`] if validation fails, or
    /// [`HaloError::HttpClient`] if the HTTP client cannot be built. No
    /// network traffic happens here.
    pub fn new(options: HaloClientOptions) -> Result<Self, HaloError> {
        options.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&options)?);
        Self::with_transport(options, transport)
    }

    /// Builds a client over a custom transport.
    ///
    /// The transport receives both API calls and token exchanges.
    pub fn with_transport(options: HaloClientOptions, transport: Arc<dyn Transport>) -> Result<Self, HaloError> {
        options.validate()?;

        let base_url = options.effective_base_url();
        Url::parse(&base_url)
            .map_err(|e| ConfigError::invalid("base_url", format!("must be an absolute URI: {}", e)))?;

        let pipeline = Pipeline::new(transport.clone())
            .with_stage(LoggingStage::from_options(&options))
            .with_stage(RetryStage::new(RetryPolicy::from_options(&options)))
            .with_stage(AuthenticationStage::new(&options, transport)?);

        tracing::info!(
            account = %options.account(),
            base_url = %base_url,
            "Halo client initialized"
        );

        Ok(Self {
            core: Arc::new(ClientCore {
                base_url,
                pipeline: RwLock::new(Some(Arc::new(pipeline))),
            }),
            options,
        })
    }

    /// The account the client was configured for.
    pub fn account(&self) -> &str {
        self.options.account()
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.core.base_url
    }

    /// The validated options.
    pub fn options(&self) -> &HaloClientOptions {
        &self.options
    }

    /// PSA resource groups.
    pub fn psa(&self) -> PsaApi {
        PsaApi {
            core: self.core.clone(),
        }
    }

    /// Releases the HTTP transport and cached credential.
    ///
    /// Returns `true` if this call released them and `false` if the client
    /// was already disposed.
    pub fn dispose(&self) -> bool {
        let released = self.core.release();
        if released {
            tracing::debug!(account = %self.options.account(), "Halo client disposed");
        }
        released
    }

    /// True once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.core.is_released()
    }

    /// Checks that Halo is reachable and accepts the credentials.
    ///
    /// Lists ticket types, the cheapest authenticated call, and turns
    /// failures into a readable [`HaloError::ConnectionTest`]. Cancellation
    /// and disposal are returned as they are.
    pub async fn test_connection(&self, cancel: &CancellationToken) -> Result<(), HaloError> {
        tracing::debug!(base_url = %self.base_url(), "Testing connection to Halo");

        let secret = self.options.client_secret();
        match self.psa().ticket_types().list(cancel).await {
            Ok(types) => {
                tracing::info!(ticket_types = types.len(), "Connection test successful");
                Ok(())
            }
            Err(e @ (HaloError::Cancelled | HaloError::Disposed)) => Err(e),
            Err(HaloError::Api(e)) => match e.kind() {
                ApiErrorKind::Authentication => Err(HaloError::connection_test(format!(
                    "Authentication failed ({}) - verify HALO_CLIENT_ID and HALO_CLIENT_SECRET",
                    HaloError::sanitize_message(e.message(), secret)
                ))),
                ApiErrorKind::Authorization => Err(HaloError::connection_test(
                    "Credentials were accepted but lack permission - check the API application's permissions in Halo",
                )),
                _ => Err(HaloError::connection_test(HaloError::sanitize_message(
                    &e.to_string(),
                    secret,
                ))),
            },
            Err(HaloError::Timeout { duration, .. }) => Err(HaloError::connection_test(format!(
                "Connection timed out after {:?} - verify HALO_ACCOUNT or HALO_BASE_URL and that the server is reachable",
                duration
            ))),
            Err(HaloError::Http(e)) => Err(HaloError::connection_test(format!(
                "HTTP error: {} - verify HALO_ACCOUNT or HALO_BASE_URL",
                HaloError::sanitize_message(&e.to_string(), secret)
            ))),
            Err(e) => Err(HaloError::connection_test(e.sanitized_display(secret))),
        }
    }
}

impl std::fmt::Debug for HaloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaloClient")
            .field("account", &self.account())
            .field("base_url", &self.base_url())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Entry point to the PSA resource groups.
///
/// Every group shares the client's pipeline; creating one is free.
#[derive(Clone)]
pub struct PsaApi {
    core: Arc<ClientCore>,
}

impl PsaApi {
    /// Tickets.
    pub fn tickets(&self) -> TicketsApi {
        TicketsApi::new(self.core.clone())
    }

    /// Ticket types.
    pub fn ticket_types(&self) -> TicketTypesApi {
        TicketTypesApi::new(self.core.clone())
    }

    /// End users.
    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.core.clone())
    }

    /// Customers.
    pub fn clients(&self) -> ClientsApi {
        ClientsApi::new(self.core.clone())
    }

    /// Assets.
    pub fn assets(&self) -> AssetsApi {
        AssetsApi::new(self.core.clone())
    }

    /// Projects.
    pub fn projects(&self) -> ProjectsApi {
        ProjectsApi::new(self.core.clone())
    }
}
