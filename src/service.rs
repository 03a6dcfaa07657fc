//! Publisher service wiring.
//!
//! Owns the pending registry and connects intake, the payment observer,
//! and the sweep task to the wallet and store collaborators.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chain::transaction::{FeePolicy, TxAssembler};
use crate::chain::wallet::Wallet;
use crate::config::PublisherConfig;
use crate::intake::SubmissionIntake;
use crate::lifecycle::Shutdown;
use crate::payments::{run_sweeper, ObservedTransaction, PaymentObserver, PendingRegistry};
use crate::store::RecordStore;

/// Handles returned by [`Publisher::start`].
#[derive(Debug)]
pub struct RunningPublisher {
    /// Feed for transaction notifications from the ledger client.
    pub notifications: mpsc::Sender<ObservedTransaction>,
    pub observer: JoinHandle<()>,
    pub sweeper: JoinHandle<()>,
}

/// The record publisher.
pub struct Publisher {
    config: PublisherConfig,
    wallet: Arc<dyn Wallet>,
    store: Arc<dyn RecordStore>,
    registry: Arc<PendingRegistry>,
    shutdown: Shutdown,
}

impl Publisher {
    pub fn new(config: &PublisherConfig, wallet: Arc<dyn Wallet>, store: Arc<dyn RecordStore>) -> Self {
        let retention = Duration::from_secs(config.registry.retention_secs);
        Self {
            config: config.clone(),
            wallet,
            store,
            registry: Arc::new(PendingRegistry::new(retention)),
            shutdown: Shutdown::new(),
        }
    }

    pub fn registry(&self) -> Arc<PendingRegistry> {
        self.registry.clone()
    }

    /// Intake bound to this publisher's registry and wallet.
    pub fn intake(&self) -> SubmissionIntake {
        SubmissionIntake::new(
            self.registry.clone(),
            self.wallet.clone(),
            self.config.pricing.clone(),
        )
    }

    /// Spawn the notification loop and the sweep task.
    pub async fn start(&self) -> RunningPublisher {
        match self.wallet.chain_tip().await {
            Ok(height) => tracing::info!(chain_tip = height, "Wallet connected"),
            Err(e) => tracing::warn!(error = %e, "Chain tip unavailable at startup"),
        }

        let (tx, rx) = mpsc::channel(self.config.registry.notification_buffer);
        let assembler = TxAssembler::new(self.wallet.clone(), FeePolicy::from(&self.config.fees));
        let observer = PaymentObserver::new(self.registry.clone(), self.store.clone(), assembler);

        let observer = tokio::spawn(observer.run(rx, self.shutdown.subscribe()));
        let sweeper = tokio::spawn(run_sweeper(
            self.registry.clone(),
            Duration::from_secs(self.config.registry.sweep_interval_secs),
            self.shutdown.subscribe(),
        ));

        tracing::info!(
            retention_secs = self.config.registry.retention_secs,
            fee_priority = ?self.config.fees.priority,
            "Publisher started"
        );

        RunningPublisher {
            notifications: tx,
            observer,
            sweeper,
        }
    }

    /// Stop the notification loop and the sweep task.
    ///
    /// Assemblies already spawned run to completion.
    pub fn shutdown(&self) {
        let notified = self.shutdown.trigger();
        tracing::info!(tasks = notified, "Shutdown signalled");
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("pending", &self.registry.len())
            .finish()
    }
}
