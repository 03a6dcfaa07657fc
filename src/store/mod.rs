//! Published record store collaborator.
//!
//! The observer computes record transitions; persistence belongs to the
//! store. `memory.rs` provides a concurrent in-process implementation.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::chain::types::Txid;
use crate::codec::{AddFileRecord, VoteRecord};

pub use memory::{FileDescriptor, MemoryRecordStore, StoredVote};

/// Errors reported by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Tally target does not exist.
    #[error("file descriptor {0} not found")]
    NotFound(Txid),

    /// Backend write failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result of an insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Existing row updated; carries the height it had before.
    Updated { previous_height: Option<u32> },
}

/// Persistence operations consumed by the payment observer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a file descriptor, or update only its height and timestamp.
    async fn upsert_file_record(
        &self,
        txid: Txid,
        record: &AddFileRecord,
        height: Option<u32>,
        timestamp: u64,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Create a vote, or update only its height and timestamp.
    async fn upsert_vote(
        &self,
        fd_txid: Txid,
        txid: Txid,
        record: &VoteRecord,
        height: Option<u32>,
        timestamp: u64,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Apply `delta` (+1 upvote, -1 downvote) to a file descriptor's tally.
    async fn adjust_tally(&self, fd_txid: Txid, delta: i64) -> Result<(), StoreError>;
}
