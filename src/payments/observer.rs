//! Payment observer service.
//!
//! Consumes transaction notifications from the ledger client, credits
//! payments to pending submissions, reconciles published records with the
//! store, and starts one assembly per submission funded in a pass.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::chain::transaction::TxAssembler;
use crate::chain::types::Address;
use crate::codec;
use crate::observability::metrics;
use crate::payments::processor::process_record;
use crate::payments::registry::{FundedSubmission, PaymentOutcome, PendingRegistry};
use crate::payments::types::{unix_now, ObservedTransaction};
use crate::store::RecordStore;

/// Summary of one notification pass.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Outputs credited to a pending submission.
    pub payments: usize,
    /// Records reconciled with the store.
    pub records: usize,
    /// Assembly tasks started by this pass.
    pub assemblies: Vec<JoinHandle<()>>,
}

/// Service that turns observed transactions into payments and records.
pub struct PaymentObserver {
    registry: Arc<PendingRegistry>,
    store: Arc<dyn RecordStore>,
    assembler: TxAssembler,
}

impl PaymentObserver {
    pub fn new(
        registry: Arc<PendingRegistry>,
        store: Arc<dyn RecordStore>,
        assembler: TxAssembler,
    ) -> Self {
        Self {
            registry,
            store,
            assembler,
        }
    }

    /// Run the notification loop until the channel closes or shutdown.
    pub async fn run(
        self,
        mut notifications: mpsc::Receiver<ObservedTransaction>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Payment observer starting");

        loop {
            tokio::select! {
                next = notifications.recv() => {
                    let Some(tx) = next else {
                        tracing::info!("Notification channel closed, payment observer exiting");
                        break;
                    };
                    // assembly handles are detached; the tasks clean up after themselves
                    let _ = self.process_transaction(&tx).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Payment observer received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Process every output of `tx`, then start assemblies for the
    /// submissions it funded.
    pub async fn process_transaction(&self, tx: &ObservedTransaction) -> PassReport {
        let mut report = PassReport::default();
        let mut funded: Vec<Address> = Vec::new();
        let timestamp = tx.effective_timestamp(unix_now());

        for output in &tx.outputs {
            if let Some(address) = Address::from_script(&output.script) {
                match self.registry.on_payment_observed(&address, tx.utxo(output)) {
                    PaymentOutcome::Untracked => {}
                    PaymentOutcome::Duplicate => {
                        tracing::debug!(txid = %tx.txid, index = output.index, "Payment already credited");
                    }
                    PaymentOutcome::InFlight => {
                        tracing::warn!(
                            txid = %tx.txid,
                            %address,
                            value = output.value,
                            "Payment to a submission already being published, not credited"
                        );
                    }
                    PaymentOutcome::Pending { received, required } => {
                        report.payments += 1;
                        tracing::info!(%address, received, required, "Partial payment received");
                    }
                    PaymentOutcome::Funded => {
                        report.payments += 1;
                        tracing::info!(%address, "Submission fully funded");
                        if !funded.contains(&address) {
                            funded.push(address);
                        }
                    }
                }
                continue;
            }

            let Ok(record) = codec::parse(&output.script) else {
                continue;
            };
            metrics::record_record_observed(record.command().as_str());

            match process_record(self.store.as_ref(), tx.txid, &record, tx.height, timestamp).await {
                Ok(transition) => {
                    report.records += 1;
                    tracing::debug!(txid = %tx.txid, ?transition, "Record observed");
                }
                Err(e) => {
                    tracing::error!(
                        txid = %tx.txid,
                        command = %record.command(),
                        error = %e,
                        "Failed to reconcile record"
                    );
                }
            }
        }

        for address in funded {
            if let Some(submission) = self.registry.claim(&address) {
                report.assemblies.push(self.spawn_assembly(address, submission));
            }
        }

        report
    }

    fn spawn_assembly(&self, address: Address, submission: FundedSubmission) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let assembler = self.assembler.clone();

        tokio::spawn(async move {
            let _release = ReleaseOnDrop { registry, address };
            let request_id = submission.entry.id;
            match assembler.publish(&submission.utxos, &submission.entry.record).await {
                Ok(txid) => {
                    metrics::record_assembly("success");
                    tracing::info!(
                        %request_id,
                        %address,
                        %txid,
                        inputs = submission.utxos.len(),
                        "Record published"
                    );
                }
                Err(e) => {
                    metrics::record_assembly("failure");
                    tracing::error!(%request_id, %address, error = %e, "Record publication failed");
                }
            }
        })
    }
}

/// Removes a claimed submission when the assembly task ends, including
/// when it unwinds.
struct ReleaseOnDrop {
    registry: Arc<PendingRegistry>,
    address: Address,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.registry.remove(&self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::transaction::FeePolicy;
    use crate::chain::types::Txid;
    use crate::chain::wallet::{FeeRates, LocalWallet};
    use crate::codec::{AddFileRecord, Record};
    use crate::payments::registry::UserEntry;
    use crate::payments::types::ObservedOutput;
    use crate::store::MemoryRecordStore;
    use alloy::primitives::Bytes;
    use std::time::Duration;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn record() -> Record {
        Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![0x12; 34]),
            description: Some("hello".into()),
            category: None,
        })
    }

    fn setup() -> (PaymentObserver, Arc<PendingRegistry>, Arc<LocalWallet>, Arc<MemoryRecordStore>) {
        let wallet = Arc::new(LocalWallet::new(FeeRates::flat(1)));
        wallet.insert_key_hex(Address::new([0xaa; 20]), KEY).unwrap();
        let registry = Arc::new(PendingRegistry::new(Duration::from_secs(600)));
        let store = Arc::new(MemoryRecordStore::new());
        let observer = PaymentObserver::new(
            registry.clone(),
            store.clone(),
            TxAssembler::new(wallet.clone(), FeePolicy::default()),
        );
        (observer, registry, wallet, store)
    }

    fn payment(txid_byte: u8, address: Address, value: u64) -> ObservedTransaction {
        ObservedTransaction {
            txid: Txid::from_bytes([txid_byte; 32]),
            outputs: vec![ObservedOutput { value, script: address.script_pubkey(), index: 0 }],
            height: None,
            block_time: 0,
        }
    }

    #[tokio::test]
    async fn test_funded_submission_is_published_and_removed() {
        let (observer, registry, wallet, _) = setup();
        let address = Address::new([0xaa; 20]);
        registry.register(address, UserEntry::new(record(), address, 10_000));

        let report = observer.process_transaction(&payment(1, address, 10_000)).await;
        assert_eq!(report.payments, 1);
        assert_eq!(report.assemblies.len(), 1);
        for handle in report.assemblies {
            handle.await.unwrap();
        }

        assert_eq!(wallet.broadcasts().len(), 1);
        assert!(!registry.contains(&address));
    }

    #[tokio::test]
    async fn test_untracked_payment_ignored() {
        let (observer, registry, wallet, _) = setup();
        let report = observer
            .process_transaction(&payment(1, Address::new([0x01; 20]), 10_000))
            .await;
        assert_eq!(report.payments, 0);
        assert!(report.assemblies.is_empty());
        assert!(registry.is_empty());
        assert!(wallet.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_record_output_reconciled() {
        let (observer, _, _, store) = setup();
        let tx = ObservedTransaction {
            txid: Txid::from_bytes([4; 32]),
            outputs: vec![
                ObservedOutput { value: 0, script: record().serialize().unwrap(), index: 0 },
                // not a record
                ObservedOutput { value: 0, script: vec![0x6a, 0x01, 0x00], index: 1 },
            ],
            height: Some(12),
            block_time: 1_700_000_000,
        };

        let report = observer.process_transaction(&tx).await;
        assert_eq!(report.records, 1);
        let fd = store.file(&tx.txid).unwrap();
        assert_eq!(fd.height, Some(12));
        assert_eq!(fd.timestamp, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_run_exits_on_channel_close() {
        let (observer, _, _, _) = setup();
        let (tx, rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(observer.run(rx, shutdown_rx));
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    /// Wallet that signs normally but panics on broadcast.
    struct PanickingWallet(LocalWallet);

    #[async_trait::async_trait]
    impl crate::chain::wallet::Wallet for PanickingWallet {
        async fn current_receiving_address(&self) -> crate::chain::types::ChainResult<Address> {
            self.0.current_receiving_address().await
        }

        async fn change_address(&self) -> crate::chain::types::ChainResult<Address> {
            self.0.change_address().await
        }

        async fn fee_rate_per_byte(
            &self,
            priority: crate::chain::wallet::FeePriority,
        ) -> crate::chain::types::ChainResult<u64> {
            self.0.fee_rate_per_byte(priority).await
        }

        async fn chain_tip(&self) -> crate::chain::types::ChainResult<u32> {
            self.0.chain_tip().await
        }

        async fn signing_key(
            &self,
            address: &Address,
        ) -> crate::chain::types::ChainResult<alloy::signers::local::PrivateKeySigner> {
            self.0.signing_key(address).await
        }

        async fn broadcast(
            &self,
            _tx: &crate::chain::types::Transaction,
        ) -> crate::chain::types::ChainResult<Txid> {
            panic!("broadcast backend crashed");
        }
    }

    #[tokio::test]
    async fn test_panicked_assembly_releases_address() {
        let wallet = LocalWallet::new(FeeRates::flat(1));
        wallet.insert_key_hex(Address::new([0xaa; 20]), KEY).unwrap();
        let registry = Arc::new(PendingRegistry::new(Duration::from_secs(600)));
        let observer = PaymentObserver::new(
            registry.clone(),
            Arc::new(MemoryRecordStore::new()),
            TxAssembler::new(Arc::new(PanickingWallet(wallet)), FeePolicy::default()),
        );
        let address = Address::new([0xaa; 20]);
        registry.register(address, UserEntry::new(record(), address, 10_000));

        let report = observer.process_transaction(&payment(1, address, 10_000)).await;
        assert_eq!(report.assemblies.len(), 1);
        for handle in report.assemblies {
            assert!(handle.await.unwrap_err().is_panic());
        }

        assert!(!registry.contains(&address));
        assert!(registry
            .try_register(address, UserEntry::new(record(), address, 1))
            .is_ok());
    }
}
