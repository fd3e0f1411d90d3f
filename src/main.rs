//! `halo` - connectivity check for a HaloPSA tenant.
//!
//! Builds a client from the environment, verifies the credentials, then
//! prints the ticket types and the first page of open tickets.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `HALO_ACCOUNT`: Halo account name
//! - `HALO_CLIENT_ID`: API application client id
//! - `HALO_CLIENT_SECRET`: API application client secret
//!
//! # Usage
//!
//! ```bash
//! HALO_ACCOUNT=acme HALO_CLIENT_ID=... HALO_CLIENT_SECRET=... ./halo
//! RUST_LOG=halo_api=debug ./halo
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use halo_api::{CancellationToken, HaloClient, HaloClientOptions, TicketFilter};

const PAGE_SIZE: u32 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean for the listing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("halo_api=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting halo v{}", env!("CARGO_PKG_VERSION"));

    let options = HaloClientOptions::from_env().context("Failed to load configuration")?;
    let client = HaloClient::new(options).context("Failed to create Halo client")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding requests");
            ctrl_c.cancel();
        }
    });

    client
        .test_connection(&cancel)
        .await
        .context("Connection test failed")?;

    let psa = client.psa();

    let ticket_types = psa
        .ticket_types()
        .list(&cancel)
        .await
        .context("Failed to list ticket types")?;
    println!("Ticket types ({}):", ticket_types.len());
    for ticket_type in ticket_types.iter().filter(|t| t.is_active()) {
        println!("  {:>6}  {}", ticket_type.id, ticket_type.display_name());
    }

    let page = psa
        .tickets()
        .list(&TicketFilter::new().open_only().with_page(1, PAGE_SIZE), &cancel)
        .await
        .context("Failed to list tickets")?;
    println!();
    println!("Open tickets ({} total):", page.record_count);
    for ticket in &page.tickets {
        println!(
            "  #{:<8} {:<40} {}",
            ticket.id,
            ticket.display_summary(),
            ticket.display_client()
        );
    }
    if page.has_more() {
        println!("  ...");
    }

    client.dispose();
    Ok(())
}
