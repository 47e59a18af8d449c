//! Fan-out behaviour of `AccountNotifier` for common operation shapes.

use std::sync::Arc;

use ledgerstream_core::codec::{TransactionCodec, TransactionDecoder};
use ledgerstream_core::config::NotifierConfig;
use ledgerstream_core::event::{ObservedTransaction, TransactionObserver};
use ledgerstream_core::model::{
    AccountEntry, AccountId, Asset, LedgerEntry, LedgerEntryChange, LedgerKey, Memo, Operation,
    OperationBody, OperationMeta, TransactionEnvelope, TransactionMeta,
};
use ledgerstream_notify::{AccountNotifier, Delivery, EventStream, EventSubscription};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn account(b: u8) -> AccountId {
    AccountId([b; 32])
}

fn notifier() -> AccountNotifier {
    let decoder: Arc<dyn TransactionDecoder> = Arc::new(TransactionCodec);
    AccountNotifier::new(decoder, NotifierConfig::default())
}

fn envelope(source: AccountId, ops: Vec<Operation>) -> TransactionEnvelope {
    TransactionEnvelope {
        source,
        fee: 100,
        seq_num: 1,
        memo: Memo::None,
        operations: ops,
    }
}

fn payment(source: Option<AccountId>, destination: AccountId) -> Operation {
    Operation {
        source,
        body: OperationBody::Payment {
            destination,
            asset: Asset::Native,
            amount: 10,
        },
    }
}

fn account_entry(id: AccountId, balance: i64) -> LedgerEntry {
    LedgerEntry::Account(AccountEntry {
        account_id: id,
        balance,
        seq_num: 1,
    })
}

fn updated(id: AccountId, balance: i64) -> LedgerEntryChange {
    LedgerEntryChange::Updated(account_entry(id, balance))
}

fn meta(changes: Vec<LedgerEntryChange>) -> TransactionMeta {
    TransactionMeta {
        changes: vec![],
        operations: vec![OperationMeta { changes }],
    }
}

fn assert_received(sub: &mut EventSubscription, env: &TransactionEnvelope, m: &TransactionMeta) {
    let event = sub.try_recv().expect("should have received an event");
    assert_eq!(&event.envelope, env);
    assert_eq!(&event.meta, m);
}

fn assert_nothing_received(sub: &mut EventSubscription) {
    assert!(sub.try_recv().is_err(), "should not have received an event");
}

// ─── Operation shapes ─────────────────────────────────────────────────────────

#[test]
fn payment_reaches_sender_and_receiver() {
    let n = notifier();
    let (_s1, mut r1) = n.subscribe_with_capacity(account(1), 5);
    let (_s2, mut r2) = n.subscribe_with_capacity(account(2), 5);
    let (_s3, mut r3) = n.subscribe_with_capacity(account(3), 5);

    // 1 -> 2
    let env = envelope(account(1), vec![payment(None, account(2))]);
    let m = meta(vec![updated(account(1), 9), updated(account(2), 11)]);
    let delivery = n.on_transaction(env.clone(), m.clone());

    assert_eq!(delivery, Delivery { delivered: 2, failed: 0 });
    assert_received(&mut r1, &env, &m);
    assert_received(&mut r2, &env, &m);
    assert_nothing_received(&mut r3);

    // 2 -> 3, with 1 paying fees as the channel account
    let env = envelope(account(1), vec![payment(Some(account(2)), account(3))]);
    let m = meta(vec![updated(account(1), 9), updated(account(2), 5), updated(account(3), 10)]);
    n.on_transaction(env.clone(), m.clone());

    assert_received(&mut r1, &env, &m);
    assert_received(&mut r2, &env, &m);
    assert_received(&mut r3, &env, &m);
}

#[test]
fn create_account_reaches_funder_and_new_account() {
    let n = notifier();
    let (_s1, mut r1) = n.subscribe_with_capacity(account(1), 5);
    let (_s2, mut r2) = n.subscribe_with_capacity(account(2), 5);

    let env = envelope(
        account(1),
        vec![Operation {
            source: None,
            body: OperationBody::CreateAccount {
                destination: account(2),
                starting_balance: 1,
            },
        }],
    );
    let m = meta(vec![
        updated(account(1), 9),
        LedgerEntryChange::Created(account_entry(account(2), 1)),
    ]);
    n.on_transaction(env.clone(), m.clone());

    assert_received(&mut r1, &env, &m);
    assert_received(&mut r2, &env, &m);
}

#[test]
fn merge_reaches_removed_and_receiving_account() {
    let n = notifier();
    let (_s1, mut r1) = n.subscribe_with_capacity(account(1), 5);
    let (_s2, mut r2) = n.subscribe_with_capacity(account(2), 5);

    // The merged account's source is the op source, but it is also removed.
    let env = envelope(
        account(7),
        vec![Operation {
            source: Some(account(7)),
            body: OperationBody::AccountMerge { destination: account(2) },
        }],
    );
    let m = meta(vec![
        LedgerEntryChange::Removed(LedgerKey::Account { account_id: account(1) }),
        updated(account(2), 1),
    ]);
    n.on_transaction(env.clone(), m.clone());

    assert_received(&mut r1, &env, &m);
    assert_received(&mut r2, &env, &m);
}

#[test]
fn untouched_account_receives_nothing() {
    let n = notifier();
    let (_s, mut r) = n.subscribe_with_capacity(account(9), 5);
    let env = envelope(account(1), vec![payment(None, account(2))]);
    let delivery = n.on_transaction(env, meta(vec![updated(account(1), 1), updated(account(2), 2)]));
    assert_eq!(delivery, Delivery::default());
    assert_nothing_received(&mut r);
}

// ─── Registry behaviour ───────────────────────────────────────────────────────

#[test]
fn stream_under_two_accounts_gets_one_copy() {
    let n = notifier();
    let (stream, mut sub) = EventStream::new(5);
    n.add_stream(account(1), Arc::clone(&stream));
    n.add_stream(account(2), Arc::clone(&stream));

    let env = envelope(account(1), vec![payment(None, account(2))]);
    let m = meta(vec![updated(account(1), 9), updated(account(2), 11)]);
    let delivery = n.on_transaction(env.clone(), m.clone());

    assert_eq!(delivery.delivered, 1);
    assert_received(&mut sub, &env, &m);
    assert_nothing_received(&mut sub);
}

#[test]
fn several_streams_per_account() {
    let n = notifier();
    let (_a, mut ra) = n.subscribe_with_capacity(account(1), 5);
    let (_b, mut rb) = n.subscribe_with_capacity(account(1), 5);

    let env = envelope(account(1), vec![payment(None, account(2))]);
    let m = meta(vec![updated(account(1), 9)]);
    n.on_transaction(env.clone(), m.clone());

    assert_received(&mut ra, &env, &m);
    assert_received(&mut rb, &env, &m);
}

#[test]
fn slow_subscriber_is_closed_without_affecting_others() {
    let n = notifier();
    let (slow, mut slow_rx) = n.subscribe_with_capacity(account(1), 2);
    let (_fast, mut fast_rx) = n.subscribe_with_capacity(account(1), 16);

    let env = envelope(account(1), vec![payment(None, account(2))]);
    let m = meta(vec![updated(account(1), 9)]);

    for _ in 0..2 {
        assert_eq!(n.on_transaction(env.clone(), m.clone()).delivered, 2);
    }
    let third = n.on_transaction(env.clone(), m.clone());
    assert_eq!(third, Delivery { delivered: 1, failed: 1 });
    assert!(slow.is_closed());

    // Closed but still registered until pruned.
    let fourth = n.on_transaction(env.clone(), m.clone());
    assert_eq!(fourth, Delivery { delivered: 1, failed: 1 });
    assert_eq!(n.registration_count(), 2);
    assert_eq!(n.prune_closed(), 1);
    assert_eq!(n.registration_count(), 1);

    for _ in 0..2 {
        assert_received(&mut slow_rx, &env, &m);
    }
    assert!(slow_rx.try_recv().is_err());
    for _ in 0..4 {
        assert_received(&mut fast_rx, &env, &m);
    }
}

#[test]
fn prune_drops_empty_accounts() {
    let n = notifier();
    let (s, _r) = n.subscribe(account(1));
    assert_eq!(n.watched_accounts(), 1);
    s.close();
    s.close();
    assert_eq!(n.prune_closed(), 1);
    assert_eq!(n.watched_accounts(), 0);
}

// ─── Observer path ────────────────────────────────────────────────────────────

#[test]
fn observer_decodes_raw_blobs() {
    let n = notifier();
    let (_s, mut r) = n.subscribe(account(2));

    let codec = TransactionCodec;
    let env = envelope(account(1), vec![payment(None, account(2))]);
    let m = meta(vec![updated(account(1), 9), updated(account(2), 11)]);
    let env_bytes = codec.encode_envelope(&env).unwrap();
    let meta_bytes = codec.encode_meta(&m).unwrap();

    n.observe(&ObservedTransaction {
        ledger: 42,
        envelope: &env_bytes,
        result: b"ok",
        meta: &meta_bytes,
    });

    let event = r.try_recv().unwrap();
    assert_eq!(event.envelope, env);
    assert_eq!(event.result.as_deref(), Some(&b"ok"[..]));
}

#[test]
fn observer_skips_garbage() {
    let n = notifier();
    let (_s, mut r) = n.subscribe(account(1));
    n.observe(&ObservedTransaction {
        ledger: 1,
        envelope: &[0xff; 3],
        result: &[],
        meta: &[],
    });
    assert_nothing_received(&mut r);
}

#[tokio::test]
async fn concurrent_producers_and_registration() {
    let n = Arc::new(notifier());
    let (_s, mut r) = n.subscribe_with_capacity(account(1), 1024);

    let mut handles = Vec::new();
    for i in 0..8u8 {
        let n = Arc::clone(&n);
        handles.push(tokio::spawn(async move {
            for _ in 0..50 {
                let env = envelope(account(1), vec![payment(None, account(2))]);
                n.on_transaction(env, meta(vec![updated(account(1), i as i64)]));
            }
            let (_extra, _rx) = n.subscribe(account(100 + i));
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let mut received = 0;
    while r.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 400);
    assert_eq!(n.watched_accounts(), 9);
}
