//! ledgerstream-notify: live account notification fan-out.
//!
//! ```text
//! TransactionEvent
//!       │
//!       ▼
//! AccountNotifier ── affected_accounts(envelope, meta)
//!       │  (RwLock<address → [EventStream]>)
//!       ├──▶ EventStream (bounded, closes itself when full)
//!       ├──▶ EventStream
//!       └──▶ ...
//! ```
//!
//! Delivery is best effort: a subscriber that falls behind loses its stream,
//! never the producer's time or another subscriber's events.

pub mod accounts;
pub mod notifier;
pub mod stream;

pub use accounts::affected_accounts;
pub use notifier::{AccountNotifier, Delivery};
pub use stream::{EventStream, EventSubscription, StreamError};
