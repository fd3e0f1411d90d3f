//! Bearer token acquisition and injection.
//!
//! The stage holds at most one credential, shared by every call made through
//! the client. A credential is considered expired [`EXPIRY_SKEW`] before the
//! server says it is, so a request never leaves with a token that lapses in
//! flight. Tokens that live less than twice the skew are refreshed halfway
//! through their lifetime instead. Refreshes are single-flighted: concurrent callers that find the
//! credential missing or expired wait for one token exchange and reuse its
//! result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use url::Url;

use super::{ApiRequest, ApiResponse, Next, RequestContext, Stage, Transport};
use crate::config::HaloClientOptions;
use crate::error::{ApiError, ConfigError, HaloError};

/// Tokens are treated as expired this long before their stated expiry.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Longest lifetime honored, whatever `expires_in` the server reports.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const TOKEN_PATH: &str = "auth/token";
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

struct Credential {
    authorization: HeaderValue,
    refresh_at: Instant,
}

impl Credential {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// When a token issued at `issued` with the given `expires_in` must be replaced.
fn refresh_deadline(issued: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in).min(MAX_TOKEN_LIFETIME);
    let skew = EXPIRY_SKEW.min(lifetime / 2);
    issued.checked_add(lifetime - skew).unwrap_or(issued)
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("authorization", &"[REDACTED]")
            .field("refresh_at", &self.refresh_at)
            .finish()
    }
}

/// Innermost stage: attaches `Authorization: Bearer <token>` to each attempt.
pub struct AuthenticationStage {
    token_url: Url,
    client_id: String,
    client_secret: String,
    transport: Arc<dyn Transport>,
    credential: RwLock<Option<Credential>>,
    refresh: Mutex<()>,
}

impl AuthenticationStage {
    /// Creates the stage. Token exchanges go straight to `transport`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL cannot be joined with
    /// the token path.
    pub fn new(options: &HaloClientOptions, transport: Arc<dyn Transport>) -> Result<Self, HaloError> {
        let base = options.effective_base_url();
        let token_url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), TOKEN_PATH))
            .map_err(|e| ConfigError::invalid("base_url", format!("must be an absolute URI: {}", e)))?;

        Ok(Self {
            token_url,
            client_id: options.client_id().to_string(),
            client_secret: options.client_secret().to_string(),
            transport,
            credential: RwLock::new(None),
            refresh: Mutex::new(()),
        })
    }

    /// URL of the token endpoint.
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    async fn fresh_authorization(&self) -> Option<HeaderValue> {
        self.credential
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_fresh())
            .map(|c| c.authorization.clone())
    }

    async fn authorization(&self, context: &RequestContext) -> Result<HeaderValue, HaloError> {
        if let Some(value) = self.fresh_authorization().await {
            return Ok(value);
        }

        let _guard = tokio::select! {
            biased;
            _ = context.cancellation().cancelled() => return Err(HaloError::Cancelled),
            guard = self.refresh.lock() => guard,
        };

        // another caller may have refreshed while we waited
        if let Some(value) = self.fresh_authorization().await {
            return Ok(value);
        }

        let credential = self.exchange(context).await?;
        let value = credential.authorization.clone();
        *self.credential.write().await = Some(credential);
        Ok(value)
    }

    /// Drops the cached credential if it is still the one that was rejected.
    async fn invalidate(&self, rejected: &HeaderValue) {
        let mut credential = self.credential.write().await;
        if credential.as_ref().is_some_and(|c| &c.authorization == rejected) {
            tracing::debug!("Discarding access token rejected by the server");
            *credential = None;
        }
    }

    fn form_body(&self) -> String {
        format!(
            "grant_type=client_credentials&client_id={}&client_secret={}&scope=all",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret)
        )
    }

    async fn exchange(&self, context: &RequestContext) -> Result<Credential, HaloError> {
        tracing::debug!(request_id = %context.correlation_id(), "Requesting access token");

        let mut request = ApiRequest::new(
            Method::POST,
            self.token_url.clone(),
            RequestContext::new(context.cancellation().clone()),
        );
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = Some(self.form_body());

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(self.exchange_failed(&response).into());
        }

        let token: TokenResponse = serde_json::from_str(response.body()).map_err(|e| {
            ApiError::authentication("Token endpoint returned an unreadable response")
                .with_status(response.status().as_u16())
                .with_request(Method::POST.as_str(), self.token_url.as_str())
                .with_source(e)
        })?;

        if token.access_token.trim().is_empty() {
            return Err(ApiError::authentication("Token endpoint returned no access token")
                .with_status(response.status().as_u16())
                .with_request(Method::POST.as_str(), self.token_url.as_str())
                .into());
        }

        let scheme = token
            .token_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Bearer".to_string());
        let mut authorization = HeaderValue::from_str(&format!("{} {}", scheme, token.access_token))
            .map_err(|_| ApiError::authentication("Token endpoint returned an unusable access token"))?;
        authorization.set_sensitive(true);

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        tracing::info!(expires_in_secs = expires_in, "Acquired access token");

        Ok(Credential {
            authorization,
            refresh_at: refresh_deadline(Instant::now(), expires_in),
        })
    }

    fn exchange_failed(&self, response: &ApiResponse) -> ApiError {
        let payload: TokenErrorResponse = serde_json::from_str(response.body()).unwrap_or_default();
        let message = match (&payload.error, &payload.error_description) {
            (_, Some(description)) => format!("Token exchange failed: {}", description),
            (Some(code), None) => format!("Token exchange failed: {}", code),
            (None, None) => format!(
                "Token exchange failed with status {} {}",
                response.status().as_u16(),
                response.reason()
            ),
        };
        let message = HaloError::sanitize_message(&message, &self.client_secret);

        tracing::warn!(
            status = response.status().as_u16(),
            error_code = payload.error.as_deref().unwrap_or(""),
            "Token exchange rejected"
        );

        ApiError::authentication(message)
            .with_status(response.status().as_u16())
            .with_error_code(payload.error)
            .with_request(Method::POST.as_str(), self.token_url.as_str())
    }
}

impl fmt::Debug for AuthenticationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationStage")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Stage for AuthenticationStage {
    async fn handle(&self, mut request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, HaloError> {
        let authorization = self.authorization(&request.context).await?;
        request.headers.insert(AUTHORIZATION, authorization.clone());

        let response = next.run(request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.invalidate(&authorization).await;
        }
        Ok(response)
    }
}
