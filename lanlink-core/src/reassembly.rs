//! Receiver-side chunk reassembly.
//!
//! A [`Reassembler`] owns the preallocated payload buffer and the
//! 1-indexed received bitmap for one session. Arrival order is
//! unconstrained; the first valid arrival of an index wins and later
//! duplicates are re-ACKed without overwriting.

use sha2::{Digest, Sha256};

use crate::config::{CHUNK_SIZE, compression_exempt};
use crate::error::TransferError;
use crate::framer::inflate;
use crate::message::FileMetadata;
use crate::packet::ChunkPacket;

// ── ChunkOutcome ─────────────────────────────────────────────────

/// What the reassembler decided about one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// New chunk stored; ACK this index.
    Accepted(u32),
    /// Index already present; payload dropped, ACK again.
    Duplicate(u32),
    /// Foreign or malformed datagram; silently dropped.
    Ignored,
    /// A datagram of this very transfer announced a different chunk
    /// total. The session must abort.
    TotalMismatch,
}

// ── Reassembler ──────────────────────────────────────────────────

/// Per-session reassembly state.
pub struct Reassembler {
    expected_hash: [u8; 32],
    total_chunks: u32,
    size: usize,
    file_bytes: Vec<u8>,
    /// 1-indexed; slot 0 is unused.
    received: Vec<bool>,
    received_count: u32,
}

impl Reassembler {
    /// Allocate state for the transfer a metadata line announced.
    pub fn new(meta: &FileMetadata) -> Result<Self, TransferError> {
        meta.validate()?;
        let expected_hash = meta.hash_bytes()?;
        let size = meta.size as usize;

        Ok(Self {
            expected_hash,
            total_chunks: meta.chunks,
            size,
            file_bytes: vec![0u8; size],
            received: vec![false; meta.chunks as usize + 1],
            received_count: 0,
        })
    }

    /// Chunks stored so far.
    pub fn received_count(&self) -> u32 {
        self.received_count
    }

    /// Whether every chunk has arrived.
    pub fn is_complete(&self) -> bool {
        self.received_count == self.total_chunks
    }

    /// Judge one decoded datagram and store its payload if it is the
    /// first arrival of a valid index.
    pub fn accept(&mut self, pkt: &ChunkPacket) -> ChunkOutcome {
        // A foreign hash means stray traffic on our port, not a
        // protocol violation by our peer.
        if pkt.hash != self.expected_hash {
            return ChunkOutcome::Ignored;
        }

        // The packet provably belongs to this transfer, so a
        // disagreeing total is fatal.
        if pkt.total != self.total_chunks {
            return ChunkOutcome::TotalMismatch;
        }

        if pkt.index == 0 || pkt.index > self.total_chunks {
            return ChunkOutcome::Ignored;
        }

        let offset = (pkt.index as usize - 1) * CHUNK_SIZE;
        if offset + pkt.payload.len() > self.size {
            return ChunkOutcome::Ignored;
        }

        if self.received[pkt.index as usize] {
            return ChunkOutcome::Duplicate(pkt.index);
        }

        self.file_bytes[offset..offset + pkt.payload.len()].copy_from_slice(&pkt.payload);
        self.received[pkt.index as usize] = true;
        self.received_count += 1;
        ChunkOutcome::Accepted(pkt.index)
    }

    /// Verify the digest and release the raw reassembled bytes.
    ///
    /// Call only once [`Self::is_complete`] holds.
    pub fn into_verified(self) -> Result<Vec<u8>, TransferError> {
        let digest: [u8; 32] = Sha256::digest(&self.file_bytes).into();
        if digest != self.expected_hash {
            return Err(TransferError::HashMismatch);
        }
        Ok(self.file_bytes)
    }

    /// Verify the digest and produce the delivered bytes, inflating
    /// unless the MIME type is compression-exempt.
    pub fn finish(self, mime: &str) -> Result<Vec<u8>, TransferError> {
        let raw = self.into_verified()?;
        if compression_exempt(mime) {
            Ok(raw)
        } else {
            inflate(&raw)
        }
    }
}

impl std::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("size", &self.size)
            .field("total_chunks", &self.total_chunks)
            .field("received_count", &self.received_count)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
