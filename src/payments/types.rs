//! Observed ledger activity.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::chain::types::{OutPoint, Txid, Utxo};

/// One output of an observed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedOutput {
    pub value: u64,
    pub script: Vec<u8>,
    pub index: u32,
}

/// A transaction notification from the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTransaction {
    pub txid: Txid,
    pub outputs: Vec<ObservedOutput>,
    /// Confirmation height, `None` while in the mempool.
    pub height: Option<u32>,
    /// Block timestamp (seconds since epoch), meaningful once confirmed.
    pub block_time: u64,
}

impl ObservedTransaction {
    /// Timestamp to record: block time when confirmed, otherwise `now`.
    pub fn effective_timestamp(&self, now: u64) -> u64 {
        if self.height.is_some() {
            self.block_time
        } else {
            now
        }
    }

    /// Spendable output reference for `output`.
    pub fn utxo(&self, output: &ObservedOutput) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(self.txid, output.index),
            value: output.value,
            script_pubkey: output.script.clone(),
            height: self.height,
        }
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timestamp() {
        let mut tx = ObservedTransaction {
            txid: Txid::from_bytes([1; 32]),
            outputs: vec![],
            height: None,
            block_time: 1_000,
        };
        assert_eq!(tx.effective_timestamp(5_000), 5_000);
        tx.height = Some(10);
        assert_eq!(tx.effective_timestamp(5_000), 1_000);
    }

    #[test]
    fn test_utxo_carries_outpoint_and_height() {
        let tx = ObservedTransaction {
            txid: Txid::from_bytes([2; 32]),
            outputs: vec![ObservedOutput { value: 7, script: vec![0x51], index: 3 }],
            height: Some(4),
            block_time: 0,
        };
        let utxo = tx.utxo(&tx.outputs[0]);
        assert_eq!(utxo.outpoint, OutPoint::new(tx.txid, 3));
        assert_eq!(utxo.value, 7);
        assert_eq!(utxo.height, Some(4));
    }

    #[test]
    fn test_observed_transaction_serde() {
        let tx = ObservedTransaction {
            txid: Txid::from_bytes([3; 32]),
            outputs: vec![ObservedOutput { value: 1, script: vec![], index: 0 }],
            height: None,
            block_time: 0,
        };
        let json = serde_json::to_string(&tx).unwrap();
        let decoded: ObservedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
    }
}
