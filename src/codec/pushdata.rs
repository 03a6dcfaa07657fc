//! Two-tier push-data length prefixes.
//!
//! Lengths up to `0x4B` are written as a single byte. Longer elements use
//! `OP_PUSHDATA1` followed by one length byte. Larger push forms do not fit
//! in a record script and are rejected.

use crate::codec::error::CodecError;

/// Largest length encoded directly in the prefix byte.
pub const MAX_DIRECT_PUSH: u8 = 0x4b;

/// One-byte length extension escape.
pub const OP_PUSHDATA1: u8 = 0x4c;

/// Append a length-prefixed element.
pub fn write_push(out: &mut Vec<u8>, data: &[u8]) -> Result<(), CodecError> {
    let len = u8::try_from(data.len()).map_err(|_| CodecError::InvalidLength)?;
    match len {
        0 => return Err(CodecError::InvalidPushData),
        1..=MAX_DIRECT_PUSH => out.push(len),
        _ => out.extend_from_slice(&[OP_PUSHDATA1, len]),
    }
    out.extend_from_slice(data);
    Ok(())
}

/// Forward-only cursor over script bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let (&byte, rest) = self.buf.split_first()?;
        self.buf = rest;
        Some(byte)
    }

    /// Consume one length-prefixed element and return its body.
    pub fn read_push(&mut self) -> Result<&'a [u8], CodecError> {
        let prefix = self.next_byte().ok_or(CodecError::InvalidPushData)?;
        let len: u8 = match prefix {
            1..=MAX_DIRECT_PUSH => prefix,
            OP_PUSHDATA1 => match self.next_byte() {
                Some(ext) if ext > MAX_DIRECT_PUSH => ext,
                _ => return Err(CodecError::InvalidPushData),
            },
            _ => return Err(CodecError::InvalidPushData),
        };
        let len = usize::from(len);

        if self.buf.len() < len {
            return Err(CodecError::InvalidPushData);
        }
        let (data, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(data)
    }
}
