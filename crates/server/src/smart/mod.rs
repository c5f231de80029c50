//! SMART App Launch (standalone, confidential or public client) against
//! external EHRs

mod client;
mod pending;
mod pkce;

pub use client::{SmartConfiguration, authorization_url, discover, exchange_code};
pub use pending::{PendingAuthorization, PendingAuthorizations};
pub use pkce::{Pkce, random_state};
