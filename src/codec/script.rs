//! Script serialization and parsing.

use alloy::primitives::Bytes;

use crate::chain::types::Txid;
use crate::codec::error::CodecError;
use crate::codec::pushdata::{write_push, Reader};
use crate::codec::record::{AddFileRecord, Command, Record, Tag, VoteRecord};

/// Null-data opcode.
pub const OP_RETURN: u8 = 0x6a;

/// Push of the two marker bytes (flag + command).
pub const OP_DATA_2: u8 = 0x02;

/// Protocol flag byte.
pub const FLAG_BYTE: u8 = 0x9f;

/// OP_RETURN, marker push, flag, command, and one 34-byte identity push.
pub const MIN_SCRIPT_SIZE: usize = 1 + 1 + 2 + 1 + 34;

/// Largest null-data output relayed by standard nodes.
pub const MAX_SCRIPT_SIZE: usize = 220;

pub const HASH_SIZE: usize = 32;

const MARKER_LEN: usize = 4;

/// Encode a record into a null-data output script.
///
/// The identity element is always written first. Empty optional text
/// fields are omitted.
pub fn serialize(record: &Record) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(MAX_SCRIPT_SIZE);
    out.extend_from_slice(&[OP_RETURN, OP_DATA_2, FLAG_BYTE, record.command() as u8]);

    match record {
        Record::AddFile(r) => {
            write_element(&mut out, Tag::ContentId, &r.content_id)?;
            write_text(&mut out, Tag::Description, r.description.as_deref())?;
            write_text(&mut out, Tag::Category, r.category.as_deref())?;
        }
        Record::Vote(r) => {
            write_element(&mut out, Tag::TargetTxid, &r.target_txid.to_display_bytes())?;
            write_element(&mut out, Tag::VoteFlag, &[u8::from(r.upvote)])?;
            write_text(&mut out, Tag::Comment, r.comment.as_deref())?;
        }
    }

    if !(MIN_SCRIPT_SIZE..=MAX_SCRIPT_SIZE).contains(&out.len()) {
        return Err(CodecError::InvalidLength);
    }
    Ok(out)
}

fn write_element(out: &mut Vec<u8>, tag: Tag, payload: &[u8]) -> Result<(), CodecError> {
    let mut element = Vec::with_capacity(payload.len() + 1);
    element.push(tag as u8);
    element.extend_from_slice(payload);
    write_push(out, &element)
}

fn write_text(out: &mut Vec<u8>, tag: Tag, text: Option<&str>) -> Result<(), CodecError> {
    match text {
        Some(text) if !text.is_empty() => write_element(out, tag, text.as_bytes()),
        _ => Ok(()),
    }
}

/// Decode a null-data output script.
///
/// Length bounds are checked before any content is read. Elements are
/// consumed while at least two bytes remain; the parse must end exactly on
/// the buffer boundary.
pub fn parse(script: &[u8]) -> Result<Record, CodecError> {
    if !(MIN_SCRIPT_SIZE..=MAX_SCRIPT_SIZE).contains(&script.len()) {
        return Err(CodecError::InvalidLength);
    }
    if script[..3] != [OP_RETURN, OP_DATA_2, FLAG_BYTE] {
        return Err(CodecError::InvalidScript);
    }
    let command = Command::try_from(script[3])?;

    let mut reader = Reader::new(&script[MARKER_LEN..]);
    let mut fields = Fields::default();
    while reader.remaining() >= 2 {
        let element = reader.read_push()?;
        let Some((&tag_byte, payload)) = element.split_first() else {
            return Err(CodecError::InvalidPushData);
        };
        match Tag::from_byte(tag_byte) {
            Some(tag) if command.accepts(tag) => fields.set(tag, payload)?,
            _ => {
                tracing::trace!(tag = tag_byte, %command, "Skipping unrecognised element");
            }
        }
    }
    if reader.remaining() != 0 {
        return Err(CodecError::InvalidScript);
    }

    fields.into_record(command)
}

/// Raw element payloads collected during a parse.
#[derive(Default)]
struct Fields<'a> {
    content_id: Option<&'a [u8]>,
    description: Option<&'a [u8]>,
    target_txid: Option<&'a [u8]>,
    vote_flag: Option<&'a [u8]>,
    comment: Option<&'a [u8]>,
    category: Option<&'a [u8]>,
}

impl<'a> Fields<'a> {
    fn set(&mut self, tag: Tag, payload: &'a [u8]) -> Result<(), CodecError> {
        let slot = match tag {
            Tag::ContentId => &mut self.content_id,
            Tag::Description => &mut self.description,
            Tag::TargetTxid => &mut self.target_txid,
            Tag::VoteFlag => &mut self.vote_flag,
            Tag::Comment => &mut self.comment,
            Tag::Category => &mut self.category,
        };
        if slot.is_some() {
            return Err(CodecError::InvalidScript);
        }
        *slot = Some(payload);
        Ok(())
    }

    fn into_record(self, command: Command) -> Result<Record, CodecError> {
        match command {
            Command::AddFile => {
                let content_id = self
                    .content_id
                    .filter(|id| !id.is_empty())
                    .ok_or(CodecError::InvalidScript)?;
                Ok(Record::AddFile(AddFileRecord {
                    content_id: Bytes::copy_from_slice(content_id),
                    description: decode_text(self.description)?,
                    category: decode_text(self.category)?,
                }))
            }
            Command::Vote => {
                let txid: [u8; HASH_SIZE] = self
                    .target_txid
                    .and_then(|raw| raw.try_into().ok())
                    .ok_or(CodecError::InvalidScript)?;
                let upvote = match self.vote_flag {
                    Some([flag]) => *flag != 0,
                    _ => return Err(CodecError::InvalidScript),
                };
                Ok(Record::Vote(VoteRecord {
                    target_txid: Txid::from_display_bytes(txid),
                    comment: decode_text(self.comment)?,
                    upvote,
                }))
            }
        }
    }
}

fn decode_text(raw: Option<&[u8]>) -> Result<Option<String>, CodecError> {
    match raw {
        None | Some([]) => Ok(None),
        Some(bytes) => std::str::from_utf8(bytes)
            .map(|s| Some(s.to_owned()))
            .map_err(|_| CodecError::InvalidScript),
    }
}
