//! Chain-specific types and error definitions.

use alloy::primitives::{hex, FixedBytes, B256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during chain and wallet operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Wallet collaborator failed or lacks data for the request.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// No key available, or the ECDSA signer rejected the digest.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Fee rate could not be obtained.
    #[error("Fee rate unavailable: {0}")]
    FeeRate(String),

    /// Fee rate exceeded the configured ceiling.
    #[error("Fee rate {current} sat/byte exceeds maximum {max} sat/byte")]
    FeeRateTooHigh { current: u64, max: u64 },

    /// Broadcast was rejected or could not be delivered.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// Previous output script is not a pay-to-pubkey-hash script.
    #[error("Unsupported previous output script")]
    UnsupportedScript,

    /// Wallet collaborator not initialised or disabled.
    #[error("Wallet not available: {0}")]
    NotAvailable(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Error parsing a hex transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid txid: {0}")]
pub struct ParseTxidError(String);

/// Transaction id held in internal byte order.
///
/// The string form (and the record wire layout) use the reversed,
/// display byte order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Txid(B256);

impl Txid {
    /// Wrap bytes in internal (hash output) order.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Wrap bytes in display order.
    pub fn from_display_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    pub fn to_display_bytes(&self) -> [u8; 32] {
        let mut bytes = self.0 .0;
        bytes.reverse();
        bytes
    }

    /// Hash a serialized transaction.
    pub fn hash(serialized: &[u8]) -> Self {
        Self::from_bytes(sha256d(serialized))
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_display_bytes()))
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", self)
    }
}

impl FromStr for Txid {
    type Err = ParseTxidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s).map_err(|e| ParseTxidError(e.to_string()))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| ParseTxidError(format!("expected 32 bytes in '{}'", s)))?;
        Ok(Self::from_display_bytes(bytes))
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Pay-to-pubkey-hash address (the 20-byte key hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(FixedBytes<20>);

impl Address {
    pub const fn new(hash: [u8; 20]) -> Self {
        Self(FixedBytes::new(hash))
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.0 .0
    }

    /// Resolve a P2PKH output script to its address.
    pub fn from_script(script: &[u8]) -> Option<Self> {
        crate::chain::script::p2pkh_hash(script).map(Self::new)
    }

    /// Output script paying this address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        crate::chain::script::p2pkh_script(self.hash())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.hash()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Reference to a previous transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Txid,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, index: u32) -> Self {
        Self { txid, index }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.txid.as_bytes());
        out.extend_from_slice(&self.index.to_le_bytes());
    }
}

/// A spendable output collected while funding a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: u64,
    pub script_pubkey: Vec<u8>,
    /// Confirmation height, `None` while unconfirmed.
    pub height: Option<u32>,
}

pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    /// Unsigned input spending `previous_output`.
    pub fn new(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            script_sig: Vec::new(),
            sequence: SEQUENCE_FINAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        Self { value, script_pubkey }
    }

    pub fn serialized_size(&self) -> usize {
        8 + varint_len(self.script_pubkey.len() as u64) + self.script_pubkey.len()
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        write_varint(out, self.script_pubkey.len() as u64);
        out.extend_from_slice(&self.script_pubkey);
    }
}

/// A transaction in the legacy (non-segwit) wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub const VERSION: i32 = 1;

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            input.previous_output.write_to(&mut out);
            write_varint(&mut out, input.script_sig.len() as u64);
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(&mut out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    pub fn serialized_size(&self) -> usize {
        let inputs: usize = self
            .inputs
            .iter()
            .map(|i| 36 + varint_len(i.script_sig.len() as u64) + i.script_sig.len() + 4)
            .sum();
        let outputs: usize = self.outputs.iter().map(TxOut::serialized_size).sum();
        8 + varint_len(self.inputs.len() as u64)
            + varint_len(self.outputs.len() as u64)
            + inputs
            + outputs
    }

    pub fn txid(&self) -> Txid {
        Txid::hash(&self.serialize())
    }
}

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

pub fn varint_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

pub fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}
