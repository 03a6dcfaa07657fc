//! Codec error definitions.

use thiserror::Error;

/// Errors produced while encoding or decoding a record script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Script is shorter than the minimum or longer than the maximum size.
    #[error("script length outside the allowed bounds")]
    InvalidLength,

    /// Marker mismatch, trailing bytes, or a malformed element payload.
    #[error("invalid script")]
    InvalidScript,

    /// Command byte is neither AddFile nor Vote.
    #[error("unknown command")]
    UnknownCommand,

    /// Length prefix is zero, non-minimal, unsupported, or overruns the buffer.
    #[error("invalid pushdata")]
    InvalidPushData,
}
