//! Chunk packet layout for the UDP data channel.
//!
//! ```text
//! Offset  Size   Field
//! ──────  ─────  ──────────────
//!   0      32    SHA-256 of the whole payload (raw digest bytes)
//!  32       4    chunk index, 1-based (u32)
//!  36       4    total chunks (u32)
//!  40       4    payload length (u32, at most CHUNK_SIZE)
//!  44       N    payload bytes
//! ──────  ─────  ──────────────
//! ```
//!
//! All integers are network byte order (big-endian). Every datagram
//! is exactly `44 + payload length` bytes.

use crate::config::CHUNK_SIZE;
use crate::error::TransferError;

/// Fixed size of the per-datagram header.
pub const CHUNK_HEADER_SIZE: usize = 44;

/// Largest datagram the protocol can produce.
pub const MAX_DATAGRAM_SIZE: usize = CHUNK_HEADER_SIZE + CHUNK_SIZE;

/// One UDP datagram of the data channel.
#[derive(Clone, PartialEq, Eq)]
pub struct ChunkPacket {
    /// Digest of the complete post-compression payload; identifies
    /// which transfer this datagram belongs to.
    pub hash: [u8; 32],
    /// 1-based position of this chunk.
    pub index: u32,
    /// Total chunks in the transfer.
    pub total: u32,
    /// This chunk's bytes.
    pub payload: Vec<u8>,
}

impl ChunkPacket {
    /// Build a packet, checking the index and payload bounds.
    pub fn new(
        hash: [u8; 32],
        index: u32,
        total: u32,
        payload: Vec<u8>,
    ) -> Result<Self, TransferError> {
        if payload.len() > CHUNK_SIZE {
            return Err(TransferError::ChunkTooLarge {
                size: payload.len(),
                max: CHUNK_SIZE,
            });
        }
        if index == 0 || index > total {
            return Err(TransferError::ProtocolViolation(
                "chunk index outside 1..=total",
            ));
        }
        Ok(Self {
            hash,
            index,
            total,
            payload,
        })
    }

    /// Serialize to the exact wire bytes (header + payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CHUNK_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.hash);
        buf.extend_from_slice(&self.index.to_be_bytes());
        buf.extend_from_slice(&self.total.to_be_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Deserialize one datagram.
    ///
    /// Fails on a short header, a declared length beyond `CHUNK_SIZE`,
    /// or a payload shorter than declared. Trailing bytes past the
    /// declared length are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, TransferError> {
        if buf.len() < CHUNK_HEADER_SIZE {
            return Err(TransferError::TruncatedPacket {
                expected: CHUNK_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&buf[0..32]);

        let index = u32::from_be_bytes(buf[32..36].try_into().unwrap());
        let total = u32::from_be_bytes(buf[36..40].try_into().unwrap());
        let len = u32::from_be_bytes(buf[40..44].try_into().unwrap()) as usize;

        if len > CHUNK_SIZE {
            return Err(TransferError::ChunkTooLarge {
                size: len,
                max: CHUNK_SIZE,
            });
        }
        if buf.len() < CHUNK_HEADER_SIZE + len {
            return Err(TransferError::TruncatedPacket {
                expected: CHUNK_HEADER_SIZE + len,
                actual: buf.len(),
            });
        }

        Ok(Self {
            hash,
            index,
            total,
            payload: buf[CHUNK_HEADER_SIZE..CHUNK_HEADER_SIZE + len].to_vec(),
        })
    }
}

impl std::fmt::Debug for ChunkPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPacket")
            .field("index", &self.index)
            .field("total", &self.total)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
