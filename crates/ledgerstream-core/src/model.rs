//! Transaction model: the subset of the ledger's transaction structures the
//! pipeline needs to work out which accounts a transaction touched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::strkey;

// ─── AccountId ────────────────────────────────────────────────────────────────

/// An account's ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Canonical address string (`G...`).
    pub fn address(&self) -> String {
        strkey::encode_account_id(&self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.address())
    }
}

impl FromStr for AccountId {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        strkey::decode_account_id(s).map(Self)
    }
}

// ─── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Memo {
    None,
    Text(String),
    Id(u64),
    Hash([u8; 32]),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Credit { code: String, issuer: AccountId },
}

/// What an operation does. Only bodies that name other accounts are modelled
/// in detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    CreateAccount {
        destination: AccountId,
        starting_balance: i64,
    },
    Payment {
        destination: AccountId,
        asset: Asset,
        amount: i64,
    },
    AccountMerge {
        destination: AccountId,
    },
    ChangeTrust {
        asset: Asset,
        limit: i64,
    },
    ManageData {
        name: String,
        value: Option<Vec<u8>>,
    },
    Other {
        kind: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Explicit source; `None` means the transaction's source account.
    pub source: Option<AccountId>,
    pub body: OperationBody,
}

impl Operation {
    /// The account the operation acts on behalf of.
    pub fn effective_source<'a>(&'a self, tx_source: &'a AccountId) -> &'a AccountId {
        self.source.as_ref().unwrap_or(tx_source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    /// Fee-paying, sequence-bearing source account.
    pub source: AccountId,
    pub fee: u32,
    pub seq_num: i64,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

// ─── Metadata ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub account_id: AccountId,
    pub balance: i64,
    pub seq_num: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntry {
    Account(AccountEntry),
    Trustline {
        account_id: AccountId,
        asset: Asset,
        balance: i64,
    },
    Data {
        account_id: AccountId,
        name: String,
    },
}

impl LedgerEntry {
    /// The account that owns this entry.
    pub fn owner(&self) -> &AccountId {
        match self {
            Self::Account(a) => &a.account_id,
            Self::Trustline { account_id, .. } | Self::Data { account_id, .. } => account_id,
        }
    }
}

/// Key of a removed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerKey {
    Account { account_id: AccountId },
    Trustline { account_id: AccountId, asset: Asset },
    Data { account_id: AccountId, name: String },
}

impl LedgerKey {
    pub fn owner(&self) -> &AccountId {
        match self {
            Self::Account { account_id }
            | Self::Trustline { account_id, .. }
            | Self::Data { account_id, .. } => account_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryChange {
    Created(LedgerEntry),
    Updated(LedgerEntry),
    Removed(LedgerKey),
    /// Snapshot of an entry before it changed; not itself a change.
    State(LedgerEntry),
}

impl LedgerEntryChange {
    /// The account whose entry was created, updated or removed.
    pub fn changed_account(&self) -> Option<&AccountId> {
        match self {
            Self::Created(e) | Self::Updated(e) => Some(e.owner()),
            Self::Removed(k) => Some(k.owner()),
            Self::State(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMeta {
    pub changes: Vec<LedgerEntryChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    /// Transaction-level changes (sequence bump, fee charge).
    pub changes: Vec<LedgerEntryChange>,
    /// One entry per operation, in operation order.
    pub operations: Vec<OperationMeta>,
}
