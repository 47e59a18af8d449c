//! `AccountNotifier`: routes each transaction event to the streams registered
//! for the accounts it touched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ledgerstream_core::codec::TransactionDecoder;
use ledgerstream_core::config::NotifierConfig;
use ledgerstream_core::event::{ObservedTransaction, TransactionEvent, TransactionObserver};
use ledgerstream_core::model::{AccountId, TransactionEnvelope, TransactionMeta};
use parking_lot::RwLock;

use crate::accounts::affected_accounts;
use crate::stream::{EventStream, EventSubscription, StreamError};

/// Outcome of fanning one event out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Streams the event was queued on.
    pub delivered: usize,
    /// Streams that were full or already closed.
    pub failed: usize,
}

/// Registry of account → streams, plus the fan-out logic.
///
/// Registrations are never removed implicitly: a closed stream stays in the
/// registry (and is skipped) until [`prune_closed`](Self::prune_closed).
pub struct AccountNotifier {
    streams: RwLock<HashMap<AccountId, Vec<Arc<EventStream>>>>,
    decoder: Arc<dyn TransactionDecoder>,
    config: NotifierConfig,
}

impl AccountNotifier {
    pub fn new(decoder: Arc<dyn TransactionDecoder>, config: NotifierConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            decoder,
            config,
        }
    }

    /// Register `stream` to receive events touching `account`.
    ///
    /// A stream may be registered under several accounts and an account may
    /// have several streams.
    pub fn add_stream(&self, account: AccountId, stream: Arc<EventStream>) {
        tracing::debug!(account = %account, stream = stream.id(), "registering account stream");
        self.streams.write().entry(account).or_default().push(stream);
    }

    /// Create and register a stream with the configured capacity.
    pub fn subscribe(&self, account: AccountId) -> (Arc<EventStream>, EventSubscription) {
        self.subscribe_with_capacity(account, self.config.stream_capacity)
    }

    pub fn subscribe_with_capacity(
        &self,
        account: AccountId,
        capacity: usize,
    ) -> (Arc<EventStream>, EventSubscription) {
        let (stream, subscription) = EventStream::new(capacity);
        self.add_stream(account, Arc::clone(&stream));
        (stream, subscription)
    }

    /// Fan out a transaction whose result bytes are not known.
    pub fn on_transaction(&self, envelope: TransactionEnvelope, meta: TransactionMeta) -> Delivery {
        self.on_event(TransactionEvent::new(envelope, meta))
    }

    /// Deliver `event` to every open stream registered for an affected
    /// account. Each stream receives the event at most once.
    ///
    /// Never blocks: a full stream is closed and counted as failed.
    pub fn on_event(&self, event: TransactionEvent) -> Delivery {
        let accounts = affected_accounts(&event.envelope, &event.meta);

        let targets: Vec<Arc<EventStream>> = {
            let registry = self.streams.read();
            let mut seen = HashSet::new();
            accounts
                .iter()
                .filter_map(|account| registry.get(account))
                .flatten()
                .filter(|stream| seen.insert(stream.id()))
                .cloned()
                .collect()
        };

        let event = Arc::new(event);
        let mut delivery = Delivery::default();
        for stream in targets {
            match stream.notify(Arc::clone(&event)) {
                Ok(()) => delivery.delivered += 1,
                Err(StreamError::Full) => {
                    tracing::warn!(stream = stream.id(), "dropped slow account subscriber");
                    delivery.failed += 1;
                }
                Err(StreamError::Closed) => delivery.failed += 1,
            }
        }

        tracing::trace!(
            accounts = accounts.len(),
            delivered = delivery.delivered,
            failed = delivery.failed,
            "transaction fanned out"
        );
        delivery
    }

    /// Drop closed streams from the registry. Returns how many registrations
    /// were removed.
    pub fn prune_closed(&self) -> usize {
        let mut registry = self.streams.write();
        let mut removed = 0;
        registry.retain(|_, streams| {
            let before = streams.len();
            streams.retain(|s| !s.is_closed());
            removed += before - streams.len();
            !streams.is_empty()
        });
        if removed > 0 {
            tracing::debug!(removed, "pruned closed account streams");
        }
        removed
    }

    /// Number of registrations (a stream under two accounts counts twice).
    pub fn registration_count(&self) -> usize {
        self.streams.read().values().map(Vec::len).sum()
    }

    pub fn watched_accounts(&self) -> usize {
        self.streams.read().len()
    }
}

impl TransactionObserver for AccountNotifier {
    fn observe(&self, tx: &ObservedTransaction<'_>) {
        let envelope = match self.decoder.decode_envelope(tx.envelope) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(ledger = tx.ledger, error = %e, "skipping undecodable envelope");
                return;
            }
        };
        let meta = match self.decoder.decode_meta(tx.meta) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(ledger = tx.ledger, error = %e, "skipping undecodable transaction meta");
                return;
            }
        };
        self.on_event(TransactionEvent::new(envelope, meta).with_result(tx.result.to_vec()));
    }
}
