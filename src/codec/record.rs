//! Record types carried by the codec.

use alloy::primitives::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::types::Txid;
use crate::codec::error::CodecError;

/// Command discriminant written after the protocol marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    AddFile = 0x01,
    Vote = 0x02,
}

impl Command {
    /// Whether `tag` carries a field of this command.
    pub fn accepts(self, tag: Tag) -> bool {
        match self {
            Command::AddFile => matches!(tag, Tag::ContentId | Tag::Description | Tag::Category),
            Command::Vote => matches!(tag, Tag::TargetTxid | Tag::VoteFlag | Tag::Comment),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::AddFile => "AddFile",
            Command::Vote => "Vote",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Command::AddFile),
            0x02 => Ok(Command::Vote),
            _ => Err(CodecError::UnknownCommand),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    ContentId = 0x00,
    Description = 0x01,
    TargetTxid = 0x02,
    VoteFlag = 0x03,
    Comment = 0x04,
    Category = 0x05,
}

impl Tag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Tag::ContentId),
            0x01 => Some(Tag::Description),
            0x02 => Some(Tag::TargetTxid),
            0x03 => Some(Tag::VoteFlag),
            0x04 => Some(Tag::Comment),
            0x05 => Some(Tag::Category),
            _ => None,
        }
    }
}

/// A file descriptor: content identifier plus optional text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFileRecord {
    pub content_id: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// An up or down vote on a previously published file descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub target_txid: Txid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub upvote: bool,
}

/// A record that can be embedded in a null-data output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Record {
    AddFile(AddFileRecord),
    Vote(VoteRecord),
}

impl Record {
    pub fn command(&self) -> Command {
        match self {
            Record::AddFile(_) => Command::AddFile,
            Record::Vote(_) => Command::Vote,
        }
    }

    /// Identity bytes: the content id, or the target txid in internal order.
    pub fn id(&self) -> &[u8] {
        match self {
            Record::AddFile(r) => &r.content_id,
            Record::Vote(r) => r.target_txid.as_bytes(),
        }
    }

    /// Free text attached to the record.
    pub fn data(&self) -> Option<&str> {
        match self {
            Record::AddFile(r) => r.description.as_deref(),
            Record::Vote(r) => r.comment.as_deref(),
        }
    }

    /// Encode into a null-data output script.
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        crate::codec::script::serialize(self)
    }
}

impl From<AddFileRecord> for Record {
    fn from(record: AddFileRecord) -> Self {
        Record::AddFile(record)
    }
}

impl From<VoteRecord> for Record {
    fn from(record: VoteRecord) -> Self {
        Record::Vote(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_byte() {
        assert_eq!(Command::try_from(0x01), Ok(Command::AddFile));
        assert_eq!(Command::try_from(0x02), Ok(Command::Vote));
        assert_eq!(Command::try_from(0x03), Err(CodecError::UnknownCommand));
    }

    #[test]
    fn test_command_accepts_only_its_tags() {
        assert!(Command::AddFile.accepts(Tag::Category));
        assert!(!Command::AddFile.accepts(Tag::Comment));
        assert!(Command::Vote.accepts(Tag::VoteFlag));
        assert!(!Command::Vote.accepts(Tag::ContentId));
    }

    #[test]
    fn test_record_json_shape() {
        let record = Record::AddFile(AddFileRecord {
            content_id: Bytes::from(vec![0x12, 0x20]),
            description: Some("hello".into()),
            category: None,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["command"], "add_file");
        assert_eq!(json["content_id"], "0x1220");
        assert!(json.get("category").is_none());

        let decoded: Record = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, record);
    }
}
