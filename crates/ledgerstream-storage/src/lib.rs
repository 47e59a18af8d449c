//! ledgerstream-storage: `Writer` and `PointerStore` backends.
//!
//! | Backend           | Writes entries | Stores checkpoints | Persistent |
//! |-------------------|----------------|--------------------|------------|
//! | `MemoryWriter`    | yes            | no                 | no         |
//! | `JsonLinesWriter` | yes            | no                 | yes        |
//! | `FilePointerStore`| no             | yes                | yes        |
//!
//! `MemoryPointerStore` lives in `ledgerstream-core`.

pub mod file;
pub mod jsonl;
pub mod memory;

pub use file::FilePointerStore;
pub use jsonl::{EntryLine, JsonLinesWriter};
pub use memory::MemoryWriter;
