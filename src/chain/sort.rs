//! Canonical (BIP-69) input and output ordering.

use std::cmp::Ordering;

use crate::chain::types::{Transaction, TxIn, TxOut};

/// Sort inputs and outputs in place.
///
/// Inputs order by previous txid in display byte order, then output index.
/// Outputs order by value, then script bytes.
pub fn canonical_sort(tx: &mut Transaction) {
    tx.inputs.sort_by(compare_inputs);
    tx.outputs.sort_by(compare_outputs);
}

fn compare_inputs(a: &TxIn, b: &TxIn) -> Ordering {
    a.previous_output
        .txid
        .to_display_bytes()
        .cmp(&b.previous_output.txid.to_display_bytes())
        .then(a.previous_output.index.cmp(&b.previous_output.index))
}

fn compare_outputs(a: &TxOut, b: &TxOut) -> Ordering {
    a.value
        .cmp(&b.value)
        .then_with(|| a.script_pubkey.cmp(&b.script_pubkey))
}
