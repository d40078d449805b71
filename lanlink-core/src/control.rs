//! Control-channel grammar and codec.
//!
//! Every control message is one `\n`-terminated UTF-8 line:
//!
//! ```text
//! MetadataLine := JsonObject "\n"        (text Message or FileMetadata)
//! StartLine    := "Start:" Digit+ "\n"
//! AckLine      := "chunk" Digit+ "\n"    (1-based)
//! SuccessLine  := "stop\n"
//! ErrorLine    := "error:" Kind "\n"
//! ```
//!
//! The metadata line is discriminated explicitly by its
//! `message_type` field: `text` parses as a full [`Message`], every
//! other kind as a [`FileMetadata`].

use bytes::{BufMut, BytesMut};
use serde::Deserialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransferError;
use crate::message::{FileMetadata, Message, MessageKind};

/// Upper bound on one control line (metadata JSON included).
pub const MAX_LINE_SIZE: usize = 16 * 1024;

// ── Terminator ───────────────────────────────────────────────────

/// The final line of a session, written exactly once by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `stop` — transfer verified and forwarded.
    Stop,
    /// `error:timeout` — no UDP progress or budget exceeded.
    Timeout,
    /// `error:hash_mismatch` — reassembled digest differs.
    HashMismatch,
    /// `error:udp_read` — fatal UDP socket error.
    UdpRead,
    /// `error:receive_failed` — any other receiver abort.
    ReceiveFailed,
}

impl Terminator {
    /// The exact wire spelling, without the trailing newline.
    pub fn as_line(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Timeout => "error:timeout",
            Self::HashMismatch => "error:hash_mismatch",
            Self::UdpRead => "error:udp_read",
            Self::ReceiveFailed => "error:receive_failed",
        }
    }

    /// The sender-side error a non-`stop` terminator maps to.
    ///
    /// Returns `None` for [`Terminator::Stop`].
    pub fn into_error(self) -> Option<TransferError> {
        match self {
            Self::Stop => None,
            Self::Timeout => Some(TransferError::Timeout),
            Self::HashMismatch => Some(TransferError::HashMismatch),
            Self::UdpRead => Some(TransferError::UdpRead(std::io::Error::other(
                "reported by receiver",
            ))),
            Self::ReceiveFailed => Some(TransferError::ReceiveFailed("reported by receiver")),
        }
    }
}

// ── ControlLine ──────────────────────────────────────────────────

/// One parsed control-channel line.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlLine {
    /// Metadata line carrying a pure text message.
    Text(Message),
    /// Metadata line announcing a chunked file transfer.
    File(FileMetadata),
    /// `Start:<port>` — the receiver's session UDP port.
    Start(u16),
    /// `chunk<idx>` — per-chunk acknowledgement.
    Ack(u32),
    /// Session terminator.
    Term(Terminator),
}

impl ControlLine {
    /// Parse one line (newline already stripped).
    pub fn parse(line: &str) -> Result<Self, TransferError> {
        if let Some(rest) = line.strip_prefix("Start:") {
            let port = rest
                .parse::<u16>()
                .map_err(|_| TransferError::ProtocolViolation("unparseable Start port"))?;
            return Ok(Self::Start(port));
        }

        if let Some(rest) = line.strip_prefix("chunk") {
            let idx = rest
                .parse::<u32>()
                .map_err(|_| TransferError::ProtocolViolation("unparseable ACK index"))?;
            return Ok(Self::Ack(idx));
        }

        if line == "stop" {
            return Ok(Self::Term(Terminator::Stop));
        }

        if let Some(kind) = line.strip_prefix("error:") {
            let term = match kind {
                "timeout" => Terminator::Timeout,
                "hash_mismatch" => Terminator::HashMismatch,
                "udp_read" => Terminator::UdpRead,
                "receive_failed" => Terminator::ReceiveFailed,
                _ => return Err(TransferError::ProtocolViolation("unknown error terminator")),
            };
            return Ok(Self::Term(term));
        }

        if line.starts_with('{') {
            return Self::parse_metadata(line);
        }

        Err(TransferError::ProtocolViolation("unrecognized control line"))
    }

    /// Classify a JSON metadata line by its `message_type` tag.
    ///
    /// Only text messages carry `message_type` on the metadata line;
    /// a [`FileMetadata`] object has no such field, so its absence
    /// selects the file shape.
    fn parse_metadata(line: &str) -> Result<Self, TransferError> {
        #[derive(Deserialize)]
        struct KindProbe {
            #[serde(default)]
            message_type: Option<MessageKind>,
        }

        let probe: KindProbe = serde_json::from_str(line)?;
        match probe.message_type {
            Some(MessageKind::Text) => Ok(Self::Text(serde_json::from_str(line)?)),
            _ => Ok(Self::File(serde_json::from_str(line)?)),
        }
    }

    /// Render this line without the trailing newline.
    pub fn encode(&self) -> Result<String, TransferError> {
        Ok(match self {
            Self::Text(msg) => serde_json::to_string(msg)?,
            Self::File(meta) => serde_json::to_string(meta)?,
            Self::Start(port) => format!("Start:{port}"),
            Self::Ack(idx) => format!("chunk{idx}"),
            Self::Term(term) => term.as_line().to_string(),
        })
    }
}

// ── ControlCodec ─────────────────────────────────────────────────

/// Line codec for `tokio_util::codec::Framed` over the control socket.
///
/// Frames on `\n`; a buffered line beyond [`MAX_LINE_SIZE`] is a
/// protocol error, as is any line that fails [`ControlLine::parse`].
#[derive(Debug, Default)]
pub struct ControlCodec;

impl Decoder for ControlCodec {
    type Item = ControlLine;
    type Error = TransferError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > MAX_LINE_SIZE {
                return Err(TransferError::LineTooLong {
                    size: src.len(),
                    max: MAX_LINE_SIZE,
                });
            }
            return Ok(None);
        };

        if pos > MAX_LINE_SIZE {
            return Err(TransferError::LineTooLong {
                size: pos,
                max: MAX_LINE_SIZE,
            });
        }

        let frame = src.split_to(pos + 1);
        let line = std::str::from_utf8(&frame[..pos])
            .map_err(|_| TransferError::ProtocolViolation("control line is not UTF-8"))?;

        ControlLine::parse(line).map(Some)
    }
}

impl Encoder<ControlLine> for ControlCodec {
    type Error = TransferError;

    fn encode(&mut self, item: ControlLine, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.encode()?;
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
