//! Pay-to-pubkey-hash script helpers.

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_DATA_20: u8 = 0x14;

/// Size of a P2PKH output script.
pub const P2PKH_SCRIPT_SIZE: usize = 25;

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_SIZE);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// Extract the key hash from a P2PKH script.
pub fn p2pkh_hash(script: &[u8]) -> Option<[u8; 20]> {
    match script {
        [OP_DUP, OP_HASH160, OP_DATA_20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] => {
            hash.try_into().ok()
        }
        _ => None,
    }
}

/// Append a minimal push of up to 75 bytes, as used in signature scripts.
pub fn push_slice(script: &mut Vec<u8>, data: &[u8]) {
    debug_assert!(data.len() <= 0x4b);
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}
