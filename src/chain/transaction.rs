//! Publishing transaction assembly, signing, and broadcast.
//!
//! # Responsibilities
//! - Turn an aggregated funding set and a record into a transaction
//! - Price the transaction from the wallet's fee rate
//! - Drop uneconomical change
//! - Apply canonical ordering, sign every input, broadcast
//!
//! Any failure aborts the whole assembly; nothing partial is broadcast.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::chain::fees::{estimate_size, is_dust, DEFAULT_RELAY_FEE_PER_KB};
use crate::chain::sighash::{p2pkh_script_sig, signature_hash, SIGHASH_ALL_FORKID};
use crate::chain::sort::canonical_sort;
use crate::chain::types::{
    Address, ChainError, OutPoint, Transaction, TxIn, TxOut, Txid, Utxo,
};
use crate::chain::wallet::{FeePriority, Wallet};
use crate::codec::{CodecError, Record};
use crate::config::FeeConfig;

/// Errors that abort an assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("funding set is empty")]
    NoInputs,

    #[error("record serialization failed: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Fee parameters applied by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub priority: FeePriority,
    pub relay_fee_per_kb: u64,
    pub max_fee_rate_per_byte: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            priority: FeePriority::Economic,
            relay_fee_per_kb: DEFAULT_RELAY_FEE_PER_KB,
            max_fee_rate_per_byte: 1000,
        }
    }
}

impl From<&FeeConfig> for FeePolicy {
    fn from(config: &FeeConfig) -> Self {
        Self {
            priority: config.priority,
            relay_fee_per_kb: config.relay_fee_per_kb,
            max_fee_rate_per_byte: config.max_fee_rate_per_byte,
        }
    }
}

/// Builds and publishes record-carrying transactions.
#[derive(Clone)]
pub struct TxAssembler {
    wallet: Arc<dyn Wallet>,
    policy: FeePolicy,
}

impl TxAssembler {
    pub fn new(wallet: Arc<dyn Wallet>, policy: FeePolicy) -> Self {
        Self { wallet, policy }
    }

    pub fn policy(&self) -> FeePolicy {
        self.policy
    }

    /// Build and sign the transaction embedding `record`, spending `utxos`.
    pub async fn build_signed(
        &self,
        utxos: &[Utxo],
        record: &Record,
    ) -> Result<Transaction, AssemblyError> {
        if utxos.is_empty() {
            return Err(AssemblyError::NoInputs);
        }
        let total_in = utxos.iter().fold(0u64, |acc, u| acc.saturating_add(u.value));
        let inputs: Vec<TxIn> = utxos.iter().map(|u| TxIn::new(u.outpoint)).collect();

        let embed = TxOut::new(0, record.serialize()?);

        let rate = self.wallet.fee_rate_per_byte(self.policy.priority).await?;
        if rate > self.policy.max_fee_rate_per_byte {
            return Err(ChainError::FeeRateTooHigh {
                current: rate,
                max: self.policy.max_fee_rate_per_byte,
            }
            .into());
        }
        let estimated_size = estimate_size(utxos.len(), std::slice::from_ref(&embed), true);
        let fee = (estimated_size as u64).saturating_mul(rate);
        let change_value = total_in.saturating_sub(fee);

        let mut outputs = vec![embed];
        let change_script = self.wallet.change_address().await?.script_pubkey();
        if is_dust(change_value, change_script.len(), self.policy.relay_fee_per_kb) {
            tracing::debug!(
                change_value,
                fee,
                "Change below dust threshold, paying it as fee"
            );
        } else {
            outputs.push(TxOut::new(change_value, change_script));
        }

        let mut tx = Transaction {
            version: Transaction::VERSION,
            inputs,
            outputs,
            lock_time: 0,
        };
        canonical_sort(&mut tx);

        let prevouts: HashMap<OutPoint, &Utxo> = utxos.iter().map(|u| (u.outpoint, u)).collect();
        for index in 0..tx.inputs.len() {
            let outpoint = tx.inputs[index].previous_output;
            let utxo = prevouts
                .get(&outpoint)
                .ok_or_else(|| ChainError::Signing(format!("missing previous output {:?}", outpoint)))?;
            let address =
                Address::from_script(&utxo.script_pubkey).ok_or(ChainError::UnsupportedScript)?;
            let signer = self.wallet.signing_key(&address).await?;

            let digest = signature_hash(&tx, index, &utxo.script_pubkey, utxo.value, SIGHASH_ALL_FORKID);
            tx.inputs[index].script_sig = p2pkh_script_sig(&signer, &digest, SIGHASH_ALL_FORKID)?;
        }

        tracing::debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            total_in,
            fee_rate = rate,
            size = tx.serialized_size(),
            "Publishing transaction signed"
        );
        Ok(tx)
    }

    /// Build, sign, and broadcast. Returns the broadcast txid.
    pub async fn publish(&self, utxos: &[Utxo], record: &Record) -> Result<Txid, AssemblyError> {
        let tx = self.build_signed(utxos, record).await?;
        let txid = self.wallet.broadcast(&tx).await?;
        Ok(txid)
    }
}

impl std::fmt::Debug for TxAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxAssembler")
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::script::P2PKH_SCRIPT_SIZE;
    use crate::chain::wallet::{FeeRates, LocalWallet};
    use crate::codec::{parse, AddFileRecord};
    use alloy::primitives::Bytes;

    const KEY_A: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_B: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn wallet(rate: u64) -> Arc<LocalWallet> {
        let wallet = LocalWallet::new(FeeRates::flat(rate));
        wallet.insert_key_hex(Address::new([0xaa; 20]), KEY_A).unwrap();
        wallet.insert_key_hex(Address::new([0xbb; 20]), KEY_B).unwrap();
        Arc::new(wallet)
    }

    fn record() -> Record {
        Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![0x12; 46]),
            description: Some("a".repeat(40)),
            category: None,
        })
    }

    fn utxo(txid_byte: u8, index: u32, value: u64, owner: u8) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(Txid::from_bytes([txid_byte; 32]), index),
            value,
            script_pubkey: Address::new([owner; 20]).script_pubkey(),
            height: None,
        }
    }

    #[tokio::test]
    async fn test_build_with_change() {
        let assembler = TxAssembler::new(wallet(5), FeePolicy::default());
        let tx = assembler
            .build_signed(&[utxo(1, 0, 100_000, 0xbb)], &record())
            .await
            .unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 2);
        // embed output sorts first at zero value
        assert_eq!(tx.outputs[0].value, 0);
        assert_eq!(parse(&tx.outputs[0].script_pubkey).unwrap(), record());
        // 296 estimated bytes at 5 sat/byte
        assert_eq!(tx.outputs[1].value, 100_000 - 296 * 5);
        assert_eq!(tx.outputs[1].script_pubkey.len(), P2PKH_SCRIPT_SIZE);
        assert!(!tx.inputs[0].script_sig.is_empty());
    }

    #[tokio::test]
    async fn test_dust_change_is_dropped() {
        let assembler = TxAssembler::new(wallet(5), FeePolicy::default());
        let tx = assembler
            .build_signed(&[utxo(1, 0, 296 * 5 + 545, 0xaa)], &record())
            .await
            .unwrap();
        assert_eq!(tx.outputs.len(), 1);

        // fee larger than the inputs clamps change to zero
        let tx = assembler
            .build_signed(&[utxo(1, 0, 100, 0xaa)], &record())
            .await
            .unwrap();
        assert_eq!(tx.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_assembly_is_deterministic() {
        let utxos = vec![utxo(3, 1, 40_000, 0xaa), utxo(2, 0, 30_000, 0xbb), utxo(3, 0, 10_000, 0xaa)];
        let a = TxAssembler::new(wallet(2), FeePolicy::default())
            .build_signed(&utxos, &record())
            .await
            .unwrap();
        let mut reversed = utxos.clone();
        reversed.reverse();
        let b = TxAssembler::new(wallet(2), FeePolicy::default())
            .build_signed(&reversed, &record())
            .await
            .unwrap();
        assert_eq!(a.serialize(), b.serialize());
        assert_eq!(a.inputs[0].previous_output, OutPoint::new(Txid::from_bytes([2; 32]), 0));
    }

    #[tokio::test]
    async fn test_unknown_key_aborts() {
        let wallet = wallet(1);
        let assembler = TxAssembler::new(wallet.clone(), FeePolicy::default());
        let err = assembler
            .publish(&[utxo(1, 0, 50_000, 0xcc)], &record())
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Chain(ChainError::Signing(_))));
        assert!(wallet.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_non_p2pkh_input_aborts() {
        let assembler = TxAssembler::new(wallet(1), FeePolicy::default());
        let mut bad = utxo(1, 0, 50_000, 0xaa);
        bad.script_pubkey = vec![0x51];
        let err = assembler.build_signed(&[bad], &record()).await.unwrap_err();
        assert!(matches!(err, AssemblyError::Chain(ChainError::UnsupportedScript)));
    }

    #[tokio::test]
    async fn test_oversize_record_aborts() {
        let assembler = TxAssembler::new(wallet(1), FeePolicy::default());
        let record = Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![1; 46]),
            description: Some("x".repeat(200)),
            category: None,
        });
        let err = assembler.build_signed(&[utxo(1, 0, 50_000, 0xaa)], &record).await.unwrap_err();
        assert!(matches!(err, AssemblyError::Codec(CodecError::InvalidLength)));
    }

    #[tokio::test]
    async fn test_fee_rate_ceiling() {
        let policy = FeePolicy {
            max_fee_rate_per_byte: 10,
            ..FeePolicy::default()
        };
        let assembler = TxAssembler::new(wallet(11), policy);
        let err = assembler.build_signed(&[utxo(1, 0, 50_000, 0xaa)], &record()).await.unwrap_err();
        assert!(matches!(err, AssemblyError::Chain(ChainError::FeeRateTooHigh { current: 11, max: 10 })));
    }

    #[tokio::test]
    async fn test_publish_broadcasts_once() {
        let wallet = wallet(1);
        let assembler = TxAssembler::new(wallet.clone(), FeePolicy::default());
        let txid = assembler.publish(&[utxo(1, 0, 50_000, 0xaa)], &record()).await.unwrap();
        let sent = wallet.broadcasts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].txid(), txid);
    }
}
