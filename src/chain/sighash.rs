//! Replay-protected signature hashing and P2PKH input signing.
//!
//! # Responsibilities
//! - Compute the fork-id signature digest (BIP-143 layout, input value committed)
//! - Produce deterministic low-S DER signatures
//! - Assemble `<sig> <pubkey>` signature scripts
//!
//! # Security
//! Private keys never leave the signer and are never logged.

use alloy::signers::local::PrivateKeySigner;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::Signature;

use crate::chain::script::push_slice;
use crate::chain::types::{sha256d, write_varint, ChainError, ChainResult, Transaction};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;

/// Sighash type used for every input the assembler signs.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Digest that the signature for `input_index` commits to.
///
/// `script_code` is the previous output script and `value` the amount it
/// holds. Panics if `input_index` is out of range.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_type: u32,
) -> [u8; 32] {
    let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
    let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        prevouts.extend_from_slice(input.previous_output.txid.as_bytes());
        prevouts.extend_from_slice(&input.previous_output.index.to_le_bytes());
        sequences.extend_from_slice(&input.sequence.to_le_bytes());
    }
    let mut outputs = Vec::new();
    for output in &tx.outputs {
        output.write_to(&mut outputs);
    }

    let input = &tx.inputs[input_index];
    let mut preimage = Vec::with_capacity(156 + script_code.len());
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&prevouts));
    preimage.extend_from_slice(&sha256d(&sequences));
    preimage.extend_from_slice(input.previous_output.txid.as_bytes());
    preimage.extend_from_slice(&input.previous_output.index.to_le_bytes());
    write_varint(&mut preimage, script_code.len() as u64);
    preimage.extend_from_slice(script_code);
    preimage.extend_from_slice(&value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&outputs));
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());

    sha256d(&preimage)
}

/// Sign `digest` and build a P2PKH signature script.
pub fn p2pkh_script_sig(
    signer: &PrivateKeySigner,
    digest: &[u8; 32],
    sighash_type: u32,
) -> ChainResult<Vec<u8>> {
    let key = signer.credential();
    let signature: Signature = key
        .sign_prehash(digest)
        .map_err(|e| ChainError::Signing(e.to_string()))?;
    let signature = signature.normalize_s().unwrap_or(signature);

    let mut sig = signature.to_der().as_bytes().to_vec();
    sig.push(sighash_type as u8);
    let pubkey = key.verifying_key().to_encoded_point(true);

    let mut script = Vec::with_capacity(sig.len() + pubkey.len() + 2);
    push_slice(&mut script, &sig);
    push_slice(&mut script, pubkey.as_bytes());
    Ok(script)
}
