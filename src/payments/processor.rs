use crate::chain::types::Txid;
use crate::codec::Record;
use crate::store::{RecordStore, StoreError, UpsertOutcome};

/// What reconciling one observed record did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTransition {
    FileCreated,
    FileUpdated,
    /// `tallied` is true when the vote was applied to its target's tally.
    Vote { created: bool, tallied: bool },
}

/// Reconcile a record observed in transaction `txid` with the store.
///
/// A vote counts towards the tally exactly once: when its height first
/// becomes known, either on first sight of a confirmed vote or when a
/// mempool vote confirms. If the target file is not stored yet, the vote
/// is kept unconfirmed and the error returned, so a later confirmed
/// sighting applies it.
pub async fn process_record(
    store: &dyn RecordStore,
    txid: Txid,
    record: &Record,
    height: Option<u32>,
    timestamp: u64,
) -> Result<RecordTransition, StoreError> {
    match record {
        Record::AddFile(file) => {
            let outcome = store.upsert_file_record(txid, file, height, timestamp).await?;
            tracing::debug!(%txid, ?height, ?outcome, "File record reconciled");
            Ok(match outcome {
                UpsertOutcome::Inserted => RecordTransition::FileCreated,
                UpsertOutcome::Updated { .. } => RecordTransition::FileUpdated,
            })
        }
        Record::Vote(vote) => {
            let fd_txid = vote.target_txid;
            let outcome = store.upsert_vote(fd_txid, txid, vote, height, timestamp).await?;
            let became_confirmed = height.is_some()
                && matches!(
                    outcome,
                    UpsertOutcome::Inserted | UpsertOutcome::Updated { previous_height: None }
                );

            if became_confirmed {
                let delta = if vote.upvote { 1 } else { -1 };
                if let Err(e) = store.adjust_tally(fd_txid, delta).await {
                    // keep the vote unconfirmed so the next confirmed sighting tallies it
                    store.upsert_vote(fd_txid, txid, vote, None, timestamp).await?;
                    return Err(e);
                }
                tracing::info!(%txid, %fd_txid, delta, "Vote applied to tally");
            }

            Ok(RecordTransition::Vote {
                created: outcome == UpsertOutcome::Inserted,
                tallied: became_confirmed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{AddFileRecord, VoteRecord};
    use crate::store::MemoryRecordStore;
    use alloy::primitives::Bytes;

    const FD: Txid = Txid::from_bytes([1; 32]);
    const VOTE: Txid = Txid::from_bytes([2; 32]);

    async fn store_with_file() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        let file = Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![0x12; 34]),
            description: None,
            category: None,
        });
        process_record(&store, FD, &file, Some(1), 100).await.unwrap();
        store
    }

    fn vote(upvote: bool) -> Record {
        Record::Vote(VoteRecord {
            target_txid: FD,
            comment: None,
            upvote,
        })
    }

    #[tokio::test]
    async fn test_file_created_then_updated() {
        let store = MemoryRecordStore::new();
        let file = Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![0x12; 34]),
            description: Some("notes".into()),
            category: None,
        });

        let first = process_record(&store, FD, &file, None, 50).await.unwrap();
        assert_eq!(first, RecordTransition::FileCreated);
        let second = process_record(&store, FD, &file, Some(7), 60).await.unwrap();
        assert_eq!(second, RecordTransition::FileUpdated);

        let fd = store.file(&FD).unwrap();
        assert_eq!(fd.height, Some(7));
        assert_eq!(fd.timestamp, 60);
        assert_eq!(fd.description.as_deref(), Some("notes"));
    }

    #[tokio::test]
    async fn test_vote_tallied_on_confirmation_only() {
        let store = store_with_file().await;

        let seen = process_record(&store, VOTE, &vote(true), None, 10).await.unwrap();
        assert_eq!(seen, RecordTransition::Vote { created: true, tallied: false });
        assert_eq!(store.file(&FD).unwrap().net, 0);

        let confirmed = process_record(&store, VOTE, &vote(true), Some(5), 20).await.unwrap();
        assert_eq!(confirmed, RecordTransition::Vote { created: false, tallied: true });

        let again = process_record(&store, VOTE, &vote(true), Some(5), 20).await.unwrap();
        assert_eq!(again, RecordTransition::Vote { created: false, tallied: false });

        let fd = store.file(&FD).unwrap();
        assert_eq!((fd.upvotes, fd.downvotes, fd.net), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_vote_first_seen_confirmed() {
        let store = store_with_file().await;
        let result = process_record(&store, VOTE, &vote(false), Some(3), 10).await.unwrap();
        assert_eq!(result, RecordTransition::Vote { created: true, tallied: true });
        assert_eq!(store.file(&FD).unwrap().net, -1);
    }

    #[tokio::test]
    async fn test_vote_for_unknown_file() {
        let store = MemoryRecordStore::new();
        let err = process_record(&store, VOTE, &vote(true), Some(3), 10).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(txid) if txid == FD));
        assert_eq!(store.vote(&VOTE).unwrap().height, None);
    }

    #[tokio::test]
    async fn test_vote_tallied_once_file_arrives() {
        let store = MemoryRecordStore::new();
        process_record(&store, VOTE, &vote(true), Some(3), 10).await.unwrap_err();

        let file = Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![0x12; 34]),
            description: None,
            category: None,
        });
        process_record(&store, FD, &file, Some(3), 10).await.unwrap();

        let result = process_record(&store, VOTE, &vote(true), Some(3), 10).await.unwrap();
        assert_eq!(result, RecordTransition::Vote { created: false, tallied: true });
        let again = process_record(&store, VOTE, &vote(true), Some(3), 10).await.unwrap();
        assert_eq!(again, RecordTransition::Vote { created: false, tallied: false });

        let fd = store.file(&FD).unwrap();
        assert_eq!((fd.upvotes, fd.downvotes, fd.net), (1, 0, 1));
        assert_eq!(store.vote(&VOTE).unwrap().height, Some(3));
    }
}
