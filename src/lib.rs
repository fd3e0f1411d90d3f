//! # halo-api
//!
//! A typed async client for the HaloPSA REST API.
//!
//! ## Features
//!
//! - **Client credentials**: tokens are fetched, cached, and refreshed
//!   before they expire, with one exchange shared by concurrent callers
//! - **Retries**: 429 and 5xx responses, timeouts, and connection failures
//!   are retried with capped exponential backoff
//! - **Typed errors**: every non-success response becomes an [`ApiError`]
//!   whose [`ApiErrorKind`] says what went wrong
//! - **Cancellation**: every call takes a [`CancellationToken`] and stops
//!   promptly when it fires
//! - **Security**: the client secret and bearer tokens are never logged
//!
//! ## Architecture
//!
//! - [`config`] - Options, validation, and loading from the environment
//! - [`error`] - The error taxonomy
//! - [`pipeline`] - The request chain: logging, retry, authentication,
//!   transport
//! - [`client`] - The [`HaloClient`] facade
//! - [`resources`] - One group of operations per Halo endpoint
//! - [`models`] - Request and response records
//!
//! ## Configuration
//!
//! [`HaloClientOptions::from_env`] reads:
//!
//! - `HALO_ACCOUNT`: the account name, giving `https://{account}.halopsa.com`
//! - `HALO_CLIENT_ID`: API application client id
//! - `HALO_CLIENT_SECRET`: API application client secret
//!
//! Optional: `HALO_BASE_URL`, `HALO_REQUEST_TIMEOUT_SECS`,
//! `HALO_MAX_RETRY_ATTEMPTS`, `HALO_RETRY_DELAY_MS`,
//! `HALO_MAX_RETRY_DELAY_MS`, `HALO_EXPONENTIAL_BACKOFF`,
//! `HALO_LOG_REQUESTS`, `HALO_LOG_RESPONSES`.
//!
//! ## Example
//!
//! ```ignore
//! use halo_api::{CancellationToken, HaloClient, HaloClientOptions, TicketFilter};
//!
//! async fn example() -> Result<(), halo_api::HaloError> {
//!     let options = HaloClientOptions::new("acme", client_id, client_secret);
//!     let client = HaloClient::new(options)?;
//!     let cancel = CancellationToken::new();
//!
//!     let types = client.psa().ticket_types().list(&cancel).await?;
//!     let open = client
//!         .psa()
//!         .tickets()
//!         .list(&TicketFilter::new().open_only().with_page(1, 50), &cancel)
//!         .await?;
//!
//!     println!("{} ticket types, {} open tickets", types.len(), open.record_count);
//!     client.dispose();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod resources;

pub use client::{HaloClient, PsaApi};
pub use config::HaloClientOptions;
pub use error::{ApiError, ApiErrorKind, ConfigError, HaloError};
pub use models::{CreateTicketRequest, TicketFilter, UpdateTicketRequest};
pub use tokio_util::sync::CancellationToken;
