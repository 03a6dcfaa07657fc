//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use record_publisher::chain::{Address, FeePolicy, FeeRates, LocalWallet, Transaction, TxAssembler, Txid};
use record_publisher::payments::{ObservedOutput, ObservedTransaction, PaymentObserver, PendingRegistry};
use record_publisher::store::MemoryRecordStore;

// Anvil's first three development keys
pub const KEYS: [&str; 3] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

/// Address registered for `KEYS[i]`.
pub fn wallet_address(i: usize) -> Address {
    Address::new([0xa1 + i as u8; 20])
}

/// Local wallet holding every test key at a flat fee rate.
pub fn test_wallet(fee_rate: u64) -> Arc<LocalWallet> {
    let wallet = LocalWallet::new(FeeRates::flat(fee_rate));
    for (i, key) in KEYS.iter().enumerate() {
        wallet.insert_key_hex(wallet_address(i), key).unwrap();
    }
    wallet.set_chain_tip(800_000);
    Arc::new(wallet)
}

pub struct Harness {
    pub wallet: Arc<LocalWallet>,
    pub store: Arc<MemoryRecordStore>,
    pub registry: Arc<PendingRegistry>,
    pub observer: PaymentObserver,
}

/// Observer wired to a fresh wallet, store, and registry.
pub fn harness(fee_rate: u64) -> Harness {
    let wallet = test_wallet(fee_rate);
    let store = Arc::new(MemoryRecordStore::new());
    let registry = Arc::new(PendingRegistry::new(Duration::from_secs(600)));
    let observer = PaymentObserver::new(
        registry.clone(),
        store.clone(),
        TxAssembler::new(wallet.clone(), FeePolicy::default()),
    );
    Harness {
        wallet,
        store,
        registry,
        observer,
    }
}

/// Unconfirmed transaction paying `value` to `address` at output 0.
pub fn payment(txid_byte: u8, address: Address, value: u64) -> ObservedTransaction {
    ObservedTransaction {
        txid: Txid::from_bytes([txid_byte; 32]),
        outputs: vec![ObservedOutput {
            value,
            script: address.script_pubkey(),
            index: 0,
        }],
        height: None,
        block_time: 0,
    }
}

/// Notification for a transaction this process built.
#[allow(dead_code)]
pub fn observe(tx: &Transaction, height: Option<u32>, block_time: u64) -> ObservedTransaction {
    ObservedTransaction {
        txid: tx.txid(),
        outputs: tx
            .outputs
            .iter()
            .enumerate()
            .map(|(index, out)| ObservedOutput {
                value: out.value,
                script: out.script_pubkey.clone(),
                index: index as u32,
            })
            .collect(),
        height,
        block_time,
    }
}

/// Poll `condition` until it holds or the timeout elapses.
#[allow(dead_code)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
