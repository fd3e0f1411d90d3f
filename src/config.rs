//! Configuration for the Halo API client.
//!
//! [`HaloClientOptions`] is an immutable option bag: build it with
//! [`HaloClientOptions::new`] and the `with_*` methods, or load it from
//! `HALO_*` environment variables with [`HaloClientOptions::from_env`].
//! [`HaloClientOptions::validate`] is a pure function; the client calls it
//! before creating any network resource.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::error::ConfigError;

/// Domain every account-derived base URL lives under.
pub const HALO_DOMAIN: &str = "halopsa.com";

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default ceiling for exponential backoff.
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

const GUID_FORMAT: &str = "a valid GUID format (xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx)";

const SECRET_FORMAT: &str = "in the format of two concatenated GUIDs \
    (xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx-xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx)";

static GUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("GUID pattern is valid")
});

static CLIENT_SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        r"-[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ))
    .expect("client secret pattern is valid")
});

/// Options for [`HaloClient`](crate::HaloClient).
///
/// The client secret is never printed: `Debug` redacts it.
#[derive(Clone)]
pub struct HaloClientOptions {
    account: String,
    client_id: String,
    client_secret: String,
    base_url: Option<String>,
    request_timeout: Duration,
    max_retry_attempts: u32,
    retry_delay: Duration,
    max_retry_delay: Duration,
    use_exponential_backoff: bool,
    enable_request_logging: bool,
    enable_response_logging: bool,
    default_headers: Vec<(String, String)>,
}

impl HaloClientOptions {
    /// Creates options with the given credentials and default settings.
    ///
    /// Nothing is validated here; call [`validate`](Self::validate) or hand
    /// the options to [`HaloClient::new`](crate::HaloClient::new).
    pub fn new(
        account: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            use_exponential_backoff: true,
            enable_request_logging: false,
            enable_response_logging: false,
            default_headers: Vec::new(),
        }
    }

    /// Loads options from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `HALO_ACCOUNT`: the Halo account (tenant) name
    /// - `HALO_CLIENT_ID`: API application client id (GUID)
    /// - `HALO_CLIENT_SECRET`: API application client secret (two GUIDs)
    ///
    /// # Optional Environment Variables
    ///
    /// - `HALO_BASE_URL`: absolute URL overriding `https://{account}.halopsa.com`
    /// - `HALO_REQUEST_TIMEOUT_SECS`, `HALO_MAX_RETRY_ATTEMPTS`,
    ///   `HALO_RETRY_DELAY_MS`, `HALO_MAX_RETRY_DELAY_MS`
    /// - `HALO_EXPONENTIAL_BACKOFF`, `HALO_LOG_REQUESTS`, `HALO_LOG_RESPONSES`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value can't
    /// be parsed, or the resulting options fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut options = Self::new(
            get_required_env("HALO_ACCOUNT")?,
            get_required_env("HALO_CLIENT_ID")?,
            get_required_env("HALO_CLIENT_SECRET")?,
        );

        if let Some(base_url) = get_optional_env("HALO_BASE_URL") {
            options.base_url = Some(base_url);
        }
        if let Some(secs) = parse_env::<u64>("HALO_REQUEST_TIMEOUT_SECS")? {
            options.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env::<u32>("HALO_MAX_RETRY_ATTEMPTS")? {
            options.max_retry_attempts = attempts;
        }
        if let Some(ms) = parse_env::<u64>("HALO_RETRY_DELAY_MS")? {
            options.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>("HALO_MAX_RETRY_DELAY_MS")? {
            options.max_retry_delay = Duration::from_millis(ms);
        }
        if let Some(flag) = parse_env_bool("HALO_EXPONENTIAL_BACKOFF")? {
            options.use_exponential_backoff = flag;
        }
        if let Some(flag) = parse_env_bool("HALO_LOG_REQUESTS")? {
            options.enable_request_logging = flag;
        }
        if let Some(flag) = parse_env_bool("HALO_LOG_RESPONSES")? {
            options.enable_response_logging = flag;
        }

        options.validate()?;
        Ok(options)
    }

    /// Overrides the account-derived base URL. Must be an absolute URI.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how many times a transient failure is retried.
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the ceiling for exponential backoff.
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Enables or disables exponential backoff.
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.use_exponential_backoff = enabled;
        self
    }

    /// Enables or disables request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.enable_request_logging = enabled;
        self
    }

    /// Enables or disables response logging.
    pub fn with_response_logging(mut self, enabled: bool) -> Self {
        self.enable_response_logging = enabled;
        self
    }

    /// Adds a header sent with every request. Insertion order is kept.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The Halo account (tenant) name.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The API application client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The API application client secret.
    ///
    /// SECURITY: never log this value.
    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// The configured base URL override, if any.
    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Retries after the first attempt.
    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// Delay before the first retry.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Ceiling for exponential backoff.
    pub fn max_retry_delay(&self) -> Duration {
        self.max_retry_delay
    }

    /// Whether retries back off exponentially.
    pub fn use_exponential_backoff(&self) -> bool {
        self.use_exponential_backoff
    }

    /// Whether outgoing requests are logged.
    pub fn enable_request_logging(&self) -> bool {
        self.enable_request_logging
    }

    /// Whether responses are logged.
    pub fn enable_response_logging(&self) -> bool {
        self.enable_response_logging
    }

    /// Headers sent with every request, in insertion order.
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Returns the base URL requests are sent to.
    ///
    /// The override is returned verbatim; otherwise the URL is derived from
    /// the account as `https://{account}.halopsa.com`.
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://{}.{}", self.account, HALO_DOMAIN),
        }
    }

    /// Validates the options.
    ///
    /// Rules are checked in this order and the first violation is returned:
    ///
    /// 1. `account` is not empty or whitespace
    /// 2. `client_id` is not empty or whitespace
    /// 3. `client_secret` is not empty or whitespace
    /// 4. `client_id` is a GUID (`8-4-4-4-12` hex digits, any case)
    /// 5. `client_secret` is two GUIDs joined by a hyphen
    /// 6. `request_timeout` is greater than zero
    /// 7. `max_retry_delay` is not less than `retry_delay`
    /// 8. the base URL override, if set, is an absolute http(s) URI
    /// 9. every default header is a legal HTTP header
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` for the first rule that fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.trim().is_empty() {
            return Err(ConfigError::Empty { field: "account" });
        }

        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Empty { field: "client_id" });
        }

        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "client_secret",
            });
        }

        if !GUID_PATTERN.is_match(&self.client_id) {
            return Err(ConfigError::Format {
                field: "client_id",
                expected: GUID_FORMAT,
            });
        }

        if !CLIENT_SECRET_PATTERN.is_match(&self.client_secret) {
            return Err(ConfigError::Format {
                field: "client_secret",
                expected: SECRET_FORMAT,
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "request_timeout",
                "must be greater than zero",
            ));
        }

        if self.max_retry_delay < self.retry_delay {
            return Err(ConfigError::invalid(
                "max_retry_delay",
                "must be greater than or equal to retry_delay",
            ));
        }

        if let Some(base_url) = &self.base_url {
            validate_base_url(base_url)?;
        }

        for (name, value) in &self.default_headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(ConfigError::invalid(
                    "default_headers",
                    format!("contains an invalid header name: {:?}", name),
                ));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::invalid(
                    "default_headers",
                    format!("contains an invalid value for header {}", name),
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for HaloClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaloClientOptions")
            .field("account", &self.account)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("max_retry_delay", &self.max_retry_delay)
            .field("use_exponential_backoff", &self.use_exponential_backoff)
            .field("enable_request_logging", &self.enable_request_logging)
            .field("enable_response_logging", &self.enable_response_logging)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

/// Checks that a base URL override is an absolute http(s) URI with a host.
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(base_url.trim())
        .map_err(|e| ConfigError::invalid("base_url", format!("must be an absolute URI: {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return Err(ConfigError::invalid(
            "base_url",
            "must be an absolute URI starting with http:// or https://",
        ));
    }

    Ok(())
}

/// Gets a required environment variable, returning an error if missing or empty.
fn get_required_env(name: &'static str) -> Result<String, ConfigError> {
    get_optional_env(name).ok_or(ConfigError::MissingEnv { var: name })
}

/// Gets an optional environment variable, treating blank values as unset.
fn get_optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    get_optional_env(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| ConfigError::invalid(name, format!("is not a valid number: {:?}", raw)))
        })
        .transpose()
}

fn parse_env_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    get_optional_env(name)
        .map(|raw| parse_bool(&raw).ok_or_else(|| ConfigError::invalid(name, "must be true or false")))
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
