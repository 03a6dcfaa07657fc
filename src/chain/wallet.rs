//! Wallet collaborator interface and an in-process implementation.
//!
//! # Security
//! - Key custody belongs to the wallet; callers only borrow a signer per input
//! - Keys are never logged or serialized

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use crate::chain::types::{Address, ChainError, ChainResult, Transaction, Txid};

/// Fee-rate tier requested from the wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePriority {
    #[default]
    Economic,
    Normal,
    Priority,
}

/// Ledger wallet operations consumed by intake and the assembler.
///
/// Calls may block on the network; implementations own any retry policy.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Address handed to the next submitter. Implementations rotate it.
    async fn current_receiving_address(&self) -> ChainResult<Address>;

    /// Address receiving the change of publishing transactions.
    async fn change_address(&self) -> ChainResult<Address>;

    async fn fee_rate_per_byte(&self, priority: FeePriority) -> ChainResult<u64>;

    async fn chain_tip(&self) -> ChainResult<u32>;

    /// Signer controlling `address`.
    async fn signing_key(&self, address: &Address) -> ChainResult<PrivateKeySigner>;

    async fn broadcast(&self, tx: &Transaction) -> ChainResult<Txid>;
}

/// Per-tier fee rates in satoshis per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    pub economic: u64,
    pub normal: u64,
    pub priority: u64,
}

impl FeeRates {
    pub fn flat(rate: u64) -> Self {
        Self {
            economic: rate,
            normal: rate,
            priority: rate,
        }
    }

    pub fn get(&self, priority: FeePriority) -> u64 {
        match priority {
            FeePriority::Economic => self.economic,
            FeePriority::Normal => self.normal,
            FeePriority::Priority => self.priority,
        }
    }
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            economic: 1,
            normal: 5,
            priority: 10,
        }
    }
}

/// In-process wallet holding a fixed key set.
///
/// Receiving addresses rotate round-robin over the registered keys and the
/// first registered key receives change. Broadcasts are captured rather
/// than relayed, which makes this wallet suitable for local runs and tests.
///
/// Addresses are whatever the caller registers; they are not derived from
/// the key's HASH160. Transactions it signs only verify on a real node if
/// each address is the hash of its key's compressed public key.
#[derive(Debug, Default)]
pub struct LocalWallet {
    keys: RwLock<HashMap<Address, PrivateKeySigner>>,
    order: RwLock<Vec<Address>>,
    next: AtomicUsize,
    fee_rates: RwLock<FeeRates>,
    tip: AtomicU32,
    fail_broadcast: AtomicBool,
    broadcasts: Mutex<Vec<Transaction>>,
}

impl LocalWallet {
    pub fn new(fee_rates: FeeRates) -> Self {
        Self {
            fee_rates: RwLock::new(fee_rates),
            ..Default::default()
        }
    }

    /// Register a key for `address`.
    pub fn insert_key(&self, address: Address, signer: PrivateKeySigner) {
        let mut keys = self.keys.write().expect("wallet key lock poisoned");
        if keys.insert(address, signer).is_none() {
            self.order.write().expect("wallet order lock poisoned").push(address);
        }
        tracing::debug!(%address, "Wallet key registered");
    }

    /// Register a hex-encoded private key (with or without 0x prefix).
    pub fn insert_key_hex(&self, address: Address, private_key_hex: &str) -> ChainResult<()> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;
        self.insert_key(address, signer);
        Ok(())
    }

    pub fn set_fee_rates(&self, rates: FeeRates) {
        *self.fee_rates.write().expect("wallet fee lock poisoned") = rates;
    }

    pub fn set_chain_tip(&self, height: u32) {
        self.tip.store(height, Ordering::SeqCst);
    }

    /// Make subsequent broadcasts fail.
    pub fn set_broadcast_failure(&self, fail: bool) {
        self.fail_broadcast.store(fail, Ordering::SeqCst);
    }

    /// Transactions accepted by `broadcast`, oldest first.
    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.broadcasts.lock().expect("wallet broadcast lock poisoned").clone()
    }

    fn address_at(&self, index: usize) -> ChainResult<Address> {
        let order = self.order.read().expect("wallet order lock poisoned");
        if order.is_empty() {
            return Err(ChainError::NotAvailable("wallet has no keys".to_string()));
        }
        Ok(order[index % order.len()])
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    async fn current_receiving_address(&self) -> ChainResult<Address> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.address_at(index)
    }

    async fn change_address(&self) -> ChainResult<Address> {
        self.address_at(0)
    }

    async fn fee_rate_per_byte(&self, priority: FeePriority) -> ChainResult<u64> {
        Ok(self.fee_rates.read().expect("wallet fee lock poisoned").get(priority))
    }

    async fn chain_tip(&self) -> ChainResult<u32> {
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn signing_key(&self, address: &Address) -> ChainResult<PrivateKeySigner> {
        self.keys
            .read()
            .expect("wallet key lock poisoned")
            .get(address)
            .cloned()
            .ok_or_else(|| ChainError::Signing(format!("no key for address {}", address)))
    }

    async fn broadcast(&self, tx: &Transaction) -> ChainResult<Txid> {
        if self.fail_broadcast.load(Ordering::SeqCst) {
            return Err(ChainError::Broadcast("broadcast disabled".to_string()));
        }
        let txid = tx.txid();
        self.broadcasts
            .lock()
            .expect("wallet broadcast lock poisoned")
            .push(tx.clone());
        tracing::info!(%txid, "Transaction captured by local wallet");
        Ok(txid)
    }
}
