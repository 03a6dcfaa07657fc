//! Record codec for null-data outputs.
//!
//! # Wire Layout
//! ```text
//! marker:   OP_RETURN  0x02  0x9F  <command>
//! elements: { length-prefix, tag, payload }*
//! ```
//!
//! Every element is a valid script push: the length prefix covers the tag
//! byte plus the payload. Elements may arrive in any order and tags the
//! decoder does not know for the current command are skipped.
//!
//! # Error Policy
//! Codec errors are local and never retried. An output that fails to
//! decode is simply not a record.

pub mod error;
pub mod pushdata;
pub mod record;
pub mod script;

pub use error::CodecError;
pub use record::{AddFileRecord, Command, Record, Tag, VoteRecord};
pub use script::{parse, serialize, MAX_SCRIPT_SIZE, MIN_SCRIPT_SIZE};
