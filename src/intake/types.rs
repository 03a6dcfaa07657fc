//! Submission intake types.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::chain::types::{Address, ChainError};
use crate::codec::CodecError;
use crate::payments::RegistryError;

/// Payment instructions returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Identifier of the pending submission.
    pub request_id: Uuid,
    /// Address the payment must be sent to.
    pub address: Address,
    /// Amount to pay, in satoshis.
    pub amount_required: u64,
}

/// Errors rejecting a submission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Record does not fit the wire layout.
    #[error("record rejected: {0}")]
    Codec(#[from] CodecError),

    /// Exchange rate is zero, negative, or not a number.
    #[error("invalid exchange rate: {0}")]
    InvalidRate(f64),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Wallet could not supply a receiving address.
    #[error(transparent)]
    Chain(#[from] ChainError),
}
