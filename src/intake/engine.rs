//! Pricing and address reservation for new submissions.

use std::sync::Arc;

use crate::chain::wallet::Wallet;
use crate::codec::Record;
use crate::config::PricingConfig;
use crate::intake::types::{PaymentRequest, SubmissionError};
use crate::payments::{PendingRegistry, UserEntry};

const SATOSHIS_PER_COIN: f64 = 100_000_000.0;

/// Satoshis owed for a fee of `fee_cents` at `usd_rate` dollars per coin.
///
/// Fractional satoshis are truncated. The result is at least one satoshi,
/// so a new submission is never funded before a payment arrives.
pub fn required_amount(fee_cents: f64, usd_rate: f64) -> Result<u64, SubmissionError> {
    if !usd_rate.is_finite() || usd_rate <= 0.0 {
        return Err(SubmissionError::InvalidRate(usd_rate));
    }
    let amount = ((fee_cents / 100.0) / usd_rate * SATOSHIS_PER_COIN) as u64;
    Ok(amount.max(1))
}

/// Accepts records from submitters and registers them as pending.
#[derive(Clone)]
pub struct SubmissionIntake {
    registry: Arc<PendingRegistry>,
    wallet: Arc<dyn Wallet>,
    pricing: PricingConfig,
}

impl SubmissionIntake {
    pub fn new(registry: Arc<PendingRegistry>, wallet: Arc<dyn Wallet>, pricing: PricingConfig) -> Self {
        Self {
            registry,
            wallet,
            pricing,
        }
    }

    /// Validate `record`, reserve a receiving address, and register it.
    ///
    /// The record is checked against the wire layout before an address is
    /// reserved, so an oversized record never reaches the registry.
    pub async fn create_pending_submission(
        &self,
        record: Record,
        usd_rate: f64,
    ) -> Result<PaymentRequest, SubmissionError> {
        let script_len = record.serialize()?.len();
        let amount_required = required_amount(self.pricing.submission_fee_cents, usd_rate)?;
        let address = self.wallet.current_receiving_address().await?;

        let entry = UserEntry::new(record, address, amount_required);
        let request_id = entry.id;
        self.registry.try_register(address, entry)?;

        tracing::info!(
            %request_id,
            %address,
            amount_required,
            script_len,
            "Pending submission registered"
        );

        Ok(PaymentRequest {
            request_id,
            address,
            amount_required,
        })
    }
}

impl std::fmt::Debug for SubmissionIntake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionIntake")
            .field("pricing", &self.pricing)
            .field("pending", &self.registry.len())
            .finish()
    }
}
