//! Concurrent in-memory record store.

use alloy::primitives::Bytes;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chain::types::Txid;
use crate::codec::{AddFileRecord, VoteRecord};
use crate::store::{RecordStore, StoreError, UpsertOutcome};

/// A published file descriptor and its vote tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub txid: Txid,
    pub content_id: Bytes,
    pub description: Option<String>,
    pub category: Option<String>,
    pub height: Option<u32>,
    pub timestamp: u64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub net: i64,
}

/// A published vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVote {
    pub txid: Txid,
    pub fd_txid: Txid,
    pub comment: Option<String>,
    pub upvote: bool,
    pub height: Option<u32>,
    pub timestamp: u64,
}

/// Thread-safe store keyed by publishing txid.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    files: Arc<DashMap<Txid, FileDescriptor>>,
    votes: Arc<DashMap<Txid, StoredVote>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, txid: &Txid) -> Option<FileDescriptor> {
        self.files.get(txid).map(|r| r.value().clone())
    }

    pub fn vote(&self, txid: &Txid) -> Option<StoredVote> {
        self.votes.get(txid).map(|r| r.value().clone())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert_file_record(
        &self,
        txid: Txid,
        record: &AddFileRecord,
        height: Option<u32>,
        timestamp: u64,
    ) -> Result<UpsertOutcome, StoreError> {
        match self.files.entry(txid) {
            Entry::Occupied(mut occupied) => {
                let fd = occupied.get_mut();
                let previous_height = fd.height;
                fd.height = height;
                fd.timestamp = timestamp;
                Ok(UpsertOutcome::Updated { previous_height })
            }
            Entry::Vacant(vacant) => {
                vacant.insert(FileDescriptor {
                    txid,
                    content_id: record.content_id.clone(),
                    description: record.description.clone(),
                    category: record.category.clone(),
                    height,
                    timestamp,
                    upvotes: 0,
                    downvotes: 0,
                    net: 0,
                });
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn upsert_vote(
        &self,
        fd_txid: Txid,
        txid: Txid,
        record: &VoteRecord,
        height: Option<u32>,
        timestamp: u64,
    ) -> Result<UpsertOutcome, StoreError> {
        match self.votes.entry(txid) {
            Entry::Occupied(mut occupied) => {
                let vote = occupied.get_mut();
                let previous_height = vote.height;
                vote.height = height;
                vote.timestamp = timestamp;
                Ok(UpsertOutcome::Updated { previous_height })
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredVote {
                    txid,
                    fd_txid,
                    comment: record.comment.clone(),
                    upvote: record.upvote,
                    height,
                    timestamp,
                });
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn adjust_tally(&self, fd_txid: Txid, delta: i64) -> Result<(), StoreError> {
        let mut fd = self.files.get_mut(&fd_txid).ok_or(StoreError::NotFound(fd_txid))?;
        if delta > 0 {
            fd.upvotes += delta.unsigned_abs();
        } else {
            fd.downvotes += delta.unsigned_abs();
        }
        fd.net += delta;
        Ok(())
    }
}
