//! Domain-specific error types for the transfer protocol.
//!
//! All fallible operations return `Result<T, TransferError>`.
//! No panics on invalid input; every error is typed and recoverable.

use thiserror::Error;

use crate::control::Terminator;

/// The canonical error type for the transfer core.
#[derive(Debug, Error)]
pub enum TransferError {
    // ── Sender-side errors ───────────────────────────────────────
    /// TCP dial or handshake failure when reaching the peer.
    #[error("connect failed: {0}")]
    ConnectFailed(std::io::Error),

    /// A chunk failed to receive its ACK after the allowed retries.
    #[error("no ACK for chunk {chunk} after {attempts} attempts")]
    AckExhausted { chunk: u32, attempts: u32 },

    /// The payload could not be compressed.
    #[error("compression failed: {0}")]
    CompressionFailed(std::io::Error),

    /// A file transfer was requested with a zero-length payload.
    #[error("empty payload")]
    EmptyPayload,

    // ── Protocol errors ──────────────────────────────────────────
    /// A peer violated the control-line grammar or packet layout.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The metadata line was not valid JSON for either message shape.
    #[error("malformed metadata line: {0}")]
    MalformedMetadata(#[from] serde_json::Error),

    /// A chunk datagram was shorter than its declared payload length.
    #[error("truncated chunk packet: expected {expected} bytes, got {actual}")]
    TruncatedPacket { expected: usize, actual: usize },

    /// A chunk payload exceeds the fixed chunk size.
    #[error("chunk payload too large: {size} bytes (max {max})")]
    ChunkTooLarge { size: usize, max: usize },

    /// A control line exceeded the framing limit.
    #[error("control line too long: {size} bytes (max {max})")]
    LineTooLong { size: usize, max: usize },

    // ── Receiver-side errors ─────────────────────────────────────
    /// No UDP progress within the idle window, or the overall
    /// transfer budget was exceeded.
    #[error("transfer timed out")]
    Timeout,

    /// Post-reassembly SHA-256 differs from the announced hash.
    #[error("hash mismatch after reassembly")]
    HashMismatch,

    /// The zlib stream could not be inflated.
    #[error("decompression failed: {0}")]
    DecompressFailed(std::io::Error),

    /// Fatal socket error on the UDP receive path.
    #[error("UDP read error: {0}")]
    UdpRead(std::io::Error),

    /// The receiver aborted for any other reason after starting
    /// reception (reported by the peer or raised locally).
    #[error("receive failed: {0}")]
    ReceiveFailed(&'static str),

    // ── Transport errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The downstream sink rejected a reassembled message.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

impl TransferError {
    /// The terminator line a receiver writes for this failure.
    ///
    /// Only `timeout`, `hash_mismatch` and `udp_read` have dedicated
    /// wire spellings; everything else collapses to `receive_failed`.
    pub fn terminator(&self) -> Terminator {
        match self {
            Self::Timeout => Terminator::Timeout,
            Self::HashMismatch => Terminator::HashMismatch,
            Self::UdpRead(_) => Terminator::UdpRead,
            _ => Terminator::ReceiveFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = TransferError::AckExhausted {
            chunk: 3,
            attempts: 2,
        };
        assert!(e.to_string().contains("chunk 3"));

        let e = TransferError::ChunkTooLarge {
            size: 40000,
            max: 32768,
        };
        assert!(e.to_string().contains("40000"));
        assert!(e.to_string().contains("32768"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: TransferError = io_err.into();
        assert!(matches!(e, TransferError::Connection(_)));
    }

    #[test]
    fn terminator_mapping() {
        assert_eq!(TransferError::Timeout.terminator(), Terminator::Timeout);
        assert_eq!(
            TransferError::HashMismatch.terminator(),
            Terminator::HashMismatch
        );
        let io = std::io::Error::other("boom");
        assert_eq!(TransferError::UdpRead(io).terminator(), Terminator::UdpRead);
        assert_eq!(
            TransferError::EmptyPayload.terminator(),
            Terminator::ReceiveFailed
        );
    }
}
