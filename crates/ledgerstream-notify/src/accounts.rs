//! Affected-account derivation.

use std::collections::BTreeSet;

use ledgerstream_core::model::{AccountId, TransactionEnvelope, TransactionMeta};

/// Every account a transaction touched.
///
/// That is the effective source of each operation plus the owner of every
/// entry created, updated or removed by the transaction, at transaction level
/// or inside an operation. Pre-change `State` snapshots are not changes and do
/// not count.
pub fn affected_accounts(envelope: &TransactionEnvelope, meta: &TransactionMeta) -> BTreeSet<AccountId> {
    let mut accounts = BTreeSet::new();

    for op in &envelope.operations {
        accounts.insert(*op.effective_source(&envelope.source));
    }

    let changes = meta
        .changes
        .iter()
        .chain(meta.operations.iter().flat_map(|op| op.changes.iter()));
    for change in changes {
        if let Some(account) = change.changed_account() {
            accounts.insert(*account);
        }
    }

    accounts
}
