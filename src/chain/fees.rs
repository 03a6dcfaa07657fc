//! Size estimation and dust policy.

use crate::chain::script::P2PKH_SCRIPT_SIZE;
use crate::chain::types::{varint_len, TxOut};

/// Push of a 73-byte signature plus a 33-byte compressed key.
pub const P2PKH_SIG_SCRIPT_SIZE: usize = 1 + 73 + 1 + 33;

/// Outpoint, script length, signature script, sequence.
pub const P2PKH_INPUT_SIZE: usize = 32 + 4 + 1 + P2PKH_SIG_SCRIPT_SIZE + 4;

/// Value, script length, P2PKH script.
pub const P2PKH_OUTPUT_SIZE: usize = 8 + 1 + P2PKH_SCRIPT_SIZE;

/// Minimum relay fee in satoshis per kilobyte.
pub const DEFAULT_RELAY_FEE_PER_KB: u64 = 1000;

/// Worst-case serialized size of a transaction spending `input_count`
/// P2PKH outputs into `outputs`, plus a P2PKH change output when
/// `add_change` is set.
pub fn estimate_size(input_count: usize, outputs: &[TxOut], add_change: bool) -> usize {
    let change_count = usize::from(add_change);
    let output_bytes: usize = outputs.iter().map(TxOut::serialized_size).sum();

    8 + varint_len(input_count as u64)
        + varint_len((outputs.len() + change_count) as u64)
        + input_count * P2PKH_INPUT_SIZE
        + output_bytes
        + change_count * P2PKH_OUTPUT_SIZE
}

/// Whether an output of `amount` with a `script_len`-byte script costs more
/// to spend than a third of its value at the given relay fee.
pub fn is_dust(amount: u64, script_len: usize, relay_fee_per_kb: u64) -> bool {
    // 148 is the size of the input that would later spend this output
    let total_size = (8 + varint_len(script_len as u64) + script_len + 148) as u64;
    amount.saturating_mul(1000) / (3 * total_size) < relay_fee_per_kb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_and_output_sizes() {
        assert_eq!(P2PKH_INPUT_SIZE, 149);
        assert_eq!(P2PKH_OUTPUT_SIZE, 34);
    }

    #[test]
    fn test_estimate_with_change() {
        let embed = TxOut::new(0, vec![0x6a; 94]);
        // 8 + 1 + 1 + 149 + (8 + 1 + 94) + 34
        assert_eq!(estimate_size(1, &[embed.clone()], true), 296);
        assert_eq!(estimate_size(2, &[embed], false), 8 + 1 + 1 + 298 + 103);
    }

    #[test]
    fn test_p2pkh_dust_threshold() {
        assert!(is_dust(545, P2PKH_SCRIPT_SIZE, DEFAULT_RELAY_FEE_PER_KB));
        assert!(!is_dust(546, P2PKH_SCRIPT_SIZE, DEFAULT_RELAY_FEE_PER_KB));
        assert!(is_dust(0, P2PKH_SCRIPT_SIZE, DEFAULT_RELAY_FEE_PER_KB));
    }
}
