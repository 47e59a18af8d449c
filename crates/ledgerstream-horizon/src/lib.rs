//! ledgerstream-horizon: `LedgerClient` over the Horizon REST API.
//!
//! - Ledger subscription by cursor polling (`GET /ledgers?cursor=&order=asc`)
//! - Paged transaction fetch per ledger (`GET /ledgers/{seq}/transactions`)
//! - Automatic retry with exponential backoff for transient errors

pub mod client;
pub mod config;
pub mod error;
pub mod hal;
pub mod retry;

pub use client::HorizonClient;
pub use config::{HorizonConfig, RetryConfig};
pub use error::HorizonError;
pub use retry::RetryPolicy;
