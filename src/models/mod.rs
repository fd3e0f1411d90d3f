//! Data models for the Halo API.
//!
//! Records mirror Halo's JSON field names. Every field except the id is
//! optional and unknown fields are ignored, since Halo adds fields freely
//! and omits empty ones.

mod asset;
mod client;
mod common;
mod project;
mod ticket;
mod ticket_type;
mod user;

pub use asset::*;
pub use client::*;
pub use common::{CustomField, Envelope};
pub use project::*;
pub use ticket::*;
pub use ticket_type::*;
pub use user::*;
