//! Checkpointing through the file-backed store survives a restart.

use ledgerstream_core::checkpoint::CheckpointManager;
use ledgerstream_core::pointer::LedgerPointer;
use ledgerstream_core::types::{BlockId, ChainVersion};
use ledgerstream_storage::FilePointerStore;

#[tokio::test]
async fn resume_pointer_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");

    {
        let mut manager = CheckpointManager::new(Box::new(FilePointerStore::new(&path)), "main", 3);
        assert!(manager.resume_pointer().await.unwrap().is_none());

        let mut saves = 0;
        for seq in 1..=7u32 {
            let saved = manager
                .maybe_save(LedgerPointer::new(ChainVersion::V3, seq), Some(BlockId([seq as u8; 32])))
                .await
                .unwrap();
            if saved {
                saves += 1;
            }
        }
        // Saved after ledgers 3 and 6.
        assert_eq!(saves, 2);
        assert_eq!(
            manager.resume_pointer().await.unwrap(),
            Some(LedgerPointer::new(ChainVersion::V3, 6))
        );

        manager
            .force_save(LedgerPointer::new(ChainVersion::V3, 7), Some(BlockId([7; 32])))
            .await
            .unwrap();
    }

    let manager = CheckpointManager::new(Box::new(FilePointerStore::new(&path)), "main", 3);
    let cp = manager.load().await.unwrap().unwrap();
    assert_eq!(cp.pointer.sequence, 7);
    assert_eq!(cp.block, Some(BlockId([7; 32])));

    let other = CheckpointManager::new(Box::new(FilePointerStore::new(&path)), "other", 1);
    assert!(other.resume_pointer().await.unwrap().is_none());
}
