//! Pending submission registry.
//!
//! # Responsibilities
//! - Track submissions awaiting payment, keyed by receiving address
//! - Credit observed payments, deduplicated by outpoint
//! - Hand each funded submission to exactly one assembly
//! - Evict unpaid submissions after the retention window
//!
//! All state sits behind one reader/writer lock held only for map access.
//! A claimed (in-flight) entry is never evicted or credited again; the
//! assembly task removes it when done.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::chain::types::{Address, OutPoint, Utxo};
use crate::codec::Record;
use crate::observability::metrics;
use crate::payments::types::unix_now;

/// A record awaiting payment before it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub id: Uuid,
    pub record: Record,
    pub address: Address,
    /// Creation time, seconds since epoch.
    pub created_at: u64,
    pub amount_required: u64,
    pub amount_received: u64,
}

impl UserEntry {
    pub fn new(record: Record, address: Address, amount_required: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            record,
            address,
            created_at: unix_now(),
            amount_required,
            amount_received: 0,
        }
    }

    pub fn is_funded(&self) -> bool {
        self.amount_received >= self.amount_required
    }

    /// Whether the entry has outlived `retention_secs` at `now`.
    pub fn is_expired(&self, now: u64, retention_secs: u64) -> bool {
        self.created_at.saturating_add(retention_secs) < now
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("address {0} already has a pending submission")]
    AddressInUse(Address),
}

/// Result of crediting one observed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// No submission waits on this address.
    Untracked,
    /// Outpoint was already credited.
    Duplicate,
    /// Submission is already being published; payment not credited.
    InFlight,
    Pending { received: u64, required: u64 },
    Funded,
}

/// A funded submission handed to the assembler.
#[derive(Debug, Clone)]
pub struct FundedSubmission {
    pub entry: UserEntry,
    /// Funding outputs in outpoint order.
    pub utxos: Vec<Utxo>,
}

#[derive(Debug)]
struct Slot {
    entry: UserEntry,
    funding: BTreeMap<OutPoint, Utxo>,
    in_flight: bool,
}

/// Thread-safe map from receiving address to pending submission.
#[derive(Debug)]
pub struct PendingRegistry {
    slots: RwLock<HashMap<Address, Slot>>,
    retention_secs: u64,
}

impl PendingRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            retention_secs: retention.as_secs(),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Insert or overwrite the entry for `address`.
    pub fn register(&self, address: Address, entry: UserEntry) {
        let mut slots = self.slots.write().expect("pending registry lock poisoned");
        slots.insert(address, Slot::new(entry));
        metrics::record_pending_submissions(slots.len());
    }

    /// Insert only if no submission holds `address`.
    pub fn try_register(&self, address: Address, entry: UserEntry) -> Result<(), RegistryError> {
        let mut slots = self.slots.write().expect("pending registry lock poisoned");
        if slots.contains_key(&address) {
            return Err(RegistryError::AddressInUse(address));
        }
        slots.insert(address, Slot::new(entry));
        metrics::record_pending_submissions(slots.len());
        Ok(())
    }

    /// Credit `utxo` to the submission waiting on `address`.
    pub fn on_payment_observed(&self, address: &Address, utxo: Utxo) -> PaymentOutcome {
        let mut slots = self.slots.write().expect("pending registry lock poisoned");
        let Some(slot) = slots.get_mut(address) else {
            return PaymentOutcome::Untracked;
        };
        if slot.in_flight {
            return PaymentOutcome::InFlight;
        }
        if slot.funding.contains_key(&utxo.outpoint) {
            return PaymentOutcome::Duplicate;
        }

        slot.entry.amount_received = slot.entry.amount_received.saturating_add(utxo.value);
        slot.funding.insert(utxo.outpoint, utxo);
        metrics::record_payment();

        if slot.entry.is_funded() {
            PaymentOutcome::Funded
        } else {
            PaymentOutcome::Pending {
                received: slot.entry.amount_received,
                required: slot.entry.amount_required,
            }
        }
    }

    /// Take the funding set of a funded submission and mark it in flight.
    ///
    /// Returns `None` if the address is untracked, unfunded, or already
    /// claimed, so each submission is claimed at most once.
    pub fn claim(&self, address: &Address) -> Option<FundedSubmission> {
        let mut slots = self.slots.write().expect("pending registry lock poisoned");
        let slot = slots.get_mut(address)?;
        if slot.in_flight || !slot.entry.is_funded() {
            return None;
        }
        slot.in_flight = true;
        Some(FundedSubmission {
            entry: slot.entry.clone(),
            utxos: std::mem::take(&mut slot.funding).into_values().collect(),
        })
    }

    pub fn remove(&self, address: &Address) -> Option<UserEntry> {
        let mut slots = self.slots.write().expect("pending registry lock poisoned");
        let removed = slots.remove(address).map(|slot| slot.entry);
        metrics::record_pending_submissions(slots.len());
        removed
    }

    /// Evict unclaimed, unfunded entries older than the retention window.
    pub fn sweep(&self, now: u64) -> usize {
        let mut slots = self.slots.write().expect("pending registry lock poisoned");
        let before = slots.len();
        slots.retain(|address, slot| {
            let evict = !slot.in_flight
                && !slot.entry.is_funded()
                && slot.entry.is_expired(now, self.retention_secs);
            if evict {
                tracing::info!(
                    request_id = %slot.entry.id,
                    %address,
                    received = slot.entry.amount_received,
                    "Evicting unpaid submission"
                );
            }
            !evict
        });
        let evicted = before - slots.len();
        metrics::record_pending_submissions(slots.len());
        evicted
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.slots
            .read()
            .expect("pending registry lock poisoned")
            .contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<UserEntry> {
        self.slots
            .read()
            .expect("pending registry lock poisoned")
            .get(address)
            .map(|slot| slot.entry.clone())
    }

    pub fn len(&self) -> usize {
        self.slots.read().expect("pending registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every live entry.
    pub fn snapshot(&self) -> Vec<UserEntry> {
        self.slots
            .read()
            .expect("pending registry lock poisoned")
            .values()
            .map(|slot| slot.entry.clone())
            .collect()
    }
}

impl Slot {
    fn new(entry: UserEntry) -> Self {
        Self {
            entry,
            funding: BTreeMap::new(),
            in_flight: false,
        }
    }
}

/// Run the eviction sweep every `interval` until shutdown.
pub async fn run_sweeper(
    registry: Arc<PendingRegistry>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        retention_secs = registry.retention().as_secs(),
        "Registry sweeper starting"
    );
    let mut ticker = tokio::time::interval(interval);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = registry.sweep(unix_now());
                if evicted > 0 {
                    metrics::record_evictions(evicted);
                    tracing::debug!(evicted, remaining = registry.len(), "Sweep complete");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Registry sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
