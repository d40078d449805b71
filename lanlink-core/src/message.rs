//! The logical data model: messages, attached files, and the
//! metadata descriptor announced on the control channel.
//!
//! Field names mirror the JSON wire grammar exactly (`sender`,
//! `receiver`, `message_type`, `message`, `payload`, `name`, `type`,
//! `size`, `chunks`, `hash`). Unknown JSON fields are ignored;
//! missing required fields fail parse.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::config::{CHUNK_SIZE, chunk_count};
use crate::error::TransferError;

// ── MessageKind ──────────────────────────────────────────────────

/// Discriminant for one logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    File,
}

impl MessageKind {
    /// Whether this message travels entirely on the control channel.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Classify a reassembled attachment by its MIME type.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::File
        }
    }
}

// ── Message ──────────────────────────────────────────────────────

/// One logical unit the core transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender identifier (free-form).
    pub sender: String,

    /// IPv4 address of the destination peer.
    pub receiver: Ipv4Addr,

    /// Discriminant: `text` messages carry no files.
    pub message_type: MessageKind,

    /// Free-form text body, may be empty.
    #[serde(default)]
    pub message: String,

    /// Attached files; empty for pure text.
    #[serde(default)]
    pub payload: Vec<FilePayload>,
}

impl Message {
    /// Build a pure text message.
    pub fn text(sender: impl Into<String>, receiver: Ipv4Addr, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            receiver,
            message_type: MessageKind::Text,
            message: body.into(),
            payload: Vec::new(),
        }
    }

    /// Build a message carrying a single attachment.
    pub fn with_file(sender: impl Into<String>, receiver: Ipv4Addr, file: FilePayload) -> Self {
        Self {
            sender: sender.into(),
            receiver,
            message_type: MessageKind::from_mime(&file.mime),
            message: String::new(),
            payload: vec![file],
        }
    }

    /// Check the model invariant: text messages have no payload,
    /// every other kind has at least one attachment.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.message_type.is_text() {
            if !self.payload.is_empty() {
                return Err(TransferError::ProtocolViolation(
                    "text message with attached files",
                ));
            }
        } else if self.payload.is_empty() {
            return Err(TransferError::ProtocolViolation(
                "file message without attachments",
            ));
        }
        Ok(())
    }
}

// ── FilePayload ──────────────────────────────────────────────────

/// An attached binary blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePayload {
    /// Filename, non-empty when used.
    pub name: String,

    /// MIME type.
    #[serde(rename = "type", default = "default_mime")]
    pub mime: String,

    /// Raw bytes.
    #[serde(default)]
    pub data: Vec<u8>,
}

fn default_mime() -> String {
    "application/octet-stream".to_string()
}

impl FilePayload {
    /// New attachment with an explicit MIME type.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }
}

// ── FileMetadata ─────────────────────────────────────────────────

/// The control-line descriptor announced before any UDP chunk.
///
/// `size` and `hash` describe the post-compression payload, which is
/// the exact byte sequence the receiver reassembles and verifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Filename of the attachment.
    pub name: String,

    /// MIME type of the original file.
    #[serde(rename = "type", default = "default_mime")]
    pub mime: String,

    /// Byte count of the post-compression payload.
    pub size: u64,

    /// Number of chunks that will be sent.
    pub chunks: u32,

    /// Lowercase hex SHA-256 of the post-compression payload.
    pub hash: String,

    /// Originating sender identifier.
    pub sender: String,

    /// Destination peer address.
    pub receiver: Ipv4Addr,

    /// Accompanying text body.
    #[serde(default)]
    pub message: String,
}

impl FileMetadata {
    /// Decode the announced hash into its raw 32-byte digest.
    pub fn hash_bytes(&self) -> Result<[u8; 32], TransferError> {
        let raw = hex::decode(&self.hash)
            .map_err(|_| TransferError::ProtocolViolation("metadata hash is not valid hex"))?;
        raw.try_into()
            .map_err(|_| TransferError::ProtocolViolation("metadata hash is not 32 bytes"))
    }

    /// Check internal consistency of the announced sizes.
    ///
    /// `chunks` must equal `ceil(size / CHUNK_SIZE)` and a non-empty
    /// payload needs at least one chunk.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.size == 0 {
            return Err(TransferError::EmptyPayload);
        }
        if self.size > (u32::MAX as u64) * CHUNK_SIZE as u64 {
            return Err(TransferError::ProtocolViolation("metadata size out of range"));
        }
        if self.chunks != chunk_count(self.size as usize) {
            return Err(TransferError::ProtocolViolation(
                "metadata chunk count does not match size",
            ));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ip() -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, 20)
    }

    #[test]
    fn text_message_roundtrip() {
        let msg = Message::text("alice", ip(), "hi");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
        assert!(parsed.payload.is_empty());
        assert!(json.contains("\"message_type\":\"text\""));
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageKind::Image).unwrap(),
            "\"image\""
        );
        let kind: MessageKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(kind, MessageKind::Video);
    }

    #[test]
    fn kind_from_mime() {
        assert_eq!(MessageKind::from_mime("image/png"), MessageKind::Image);
        assert_eq!(MessageKind::from_mime("video/mp4"), MessageKind::Video);
        assert_eq!(
            MessageKind::from_mime("application/pdf"),
            MessageKind::File
        );
    }

    #[test]
    fn unknown_fields_ignored() {
        let json = r#"{"sender":"a","receiver":"10.0.0.1","message_type":"text","message":"x","payload":[],"extra":42}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, "a");
    }

    #[test]
    fn missing_required_field_fails() {
        // No receiver.
        let json = r#"{"sender":"a","message_type":"text"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn payload_mime_defaults() {
        let json = r#"{"name":"blob.bin","data":[1,2,3]}"#;
        let file: FilePayload = serde_json::from_str(json).unwrap();
        assert_eq!(file.mime, "application/octet-stream");
    }

    #[test]
    fn validate_rejects_text_with_files() {
        let mut msg = Message::text("a", ip(), "hi");
        msg.payload
            .push(FilePayload::new("x", "text/plain", vec![1]));
        assert!(msg.validate().is_err());
    }

    #[test]
    fn validate_rejects_file_without_attachment() {
        let mut msg = Message::text("a", ip(), "");
        msg.message_type = MessageKind::File;
        assert!(msg.validate().is_err());
    }

    #[test]
    fn metadata_wire_field_names() {
        let meta = FileMetadata {
            name: "cat.jpg".into(),
            mime: "image/jpeg".into(),
            size: 100,
            chunks: 1,
            hash: "ab".repeat(32),
            sender: "alice".into(),
            receiver: ip(),
            message: String::new(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"type\":\"image/jpeg\""));
        assert!(json.contains("\"chunks\":1"));

        let parsed: FileMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, meta);
        assert_eq!(parsed.hash_bytes().unwrap(), [0xab; 32]);
    }

    #[test]
    fn metadata_validation() {
        let mut meta = FileMetadata {
            name: "f".into(),
            mime: "application/octet-stream".into(),
            size: CHUNK_SIZE as u64 + 1,
            chunks: 2,
            hash: "00".repeat(32),
            sender: "a".into(),
            receiver: ip(),
            message: String::new(),
        };
        assert!(meta.validate().is_ok());

        meta.chunks = 1;
        assert!(meta.validate().is_err());

        meta.size = 0;
        assert!(matches!(
            meta.validate(),
            Err(TransferError::EmptyPayload)
        ));
    }

    #[test]
    fn bad_hash_hex_rejected() {
        let meta = FileMetadata {
            name: "f".into(),
            mime: "x".into(),
            size: 1,
            chunks: 1,
            hash: "zz".into(),
            sender: "a".into(),
            receiver: ip(),
            message: String::new(),
        };
        assert!(meta.hash_bytes().is_err());
    }
}
