//! Sender-side framing: compression, hashing, chunking.
//!
//! Turns one attached file into the exact byte sequence the data
//! channel transmits. Compression is decided by MIME type alone;
//! already-compressed formats go out as-is, everything else is
//! zlib-deflated (RFC 1950, default level). The SHA-256 covers the
//! post-compression bytes, which is what the receiver reassembles
//! and verifies.

use std::io::{Read, Write};
use std::net::Ipv4Addr;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use sha2::{Digest, Sha256};

use crate::config::{CHUNK_SIZE, chunk_count, compression_exempt};
use crate::error::TransferError;
use crate::message::{FileMetadata, FilePayload};

// ── FramedPayload ────────────────────────────────────────────────

/// A file prepared for transmission: post-compression bytes plus the
/// digest and chunk count announced in the metadata line.
#[derive(Debug, Clone)]
pub struct FramedPayload {
    bytes: Vec<u8>,
    digest: [u8; 32],
    chunks: u32,
    compressed: bool,
}

impl FramedPayload {
    /// The exact byte sequence that will be chunked.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw SHA-256 of [`Self::bytes`].
    pub fn digest(&self) -> [u8; 32] {
        self.digest
    }

    /// Lowercase hex spelling of the digest, as announced on the
    /// control channel.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Number of chunks this payload occupies.
    pub fn chunks(&self) -> u32 {
        self.chunks
    }

    /// Whether zlib was applied.
    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// The bytes of chunk `index` (1-based). The final chunk may be
    /// shorter than `CHUNK_SIZE`.
    pub fn chunk(&self, index: u32) -> &[u8] {
        let start = (index as usize - 1) * CHUNK_SIZE;
        let end = (start + CHUNK_SIZE).min(self.bytes.len());
        &self.bytes[start..end]
    }
}

// ── Framing ──────────────────────────────────────────────────────

/// Prepare one attachment for transfer.
pub fn frame_file(file: &FilePayload) -> Result<FramedPayload, TransferError> {
    if file.data.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let bytes = if compression_exempt(&file.mime) {
        file.data.clone()
    } else {
        deflate(&file.data)?
    };

    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    let chunks = chunk_count(bytes.len());

    Ok(FramedPayload {
        compressed: !compression_exempt(&file.mime),
        digest,
        chunks,
        bytes,
    })
}

/// Build the metadata line record for a framed attachment.
pub fn metadata_for(
    sender: &str,
    receiver: Ipv4Addr,
    message: &str,
    file: &FilePayload,
    framed: &FramedPayload,
) -> FileMetadata {
    FileMetadata {
        name: file.name.clone(),
        mime: file.mime.clone(),
        size: framed.bytes.len() as u64,
        chunks: framed.chunks,
        hash: framed.digest_hex(),
        sender: sender.to_string(),
        receiver,
        message: message.to_string(),
    }
}

/// zlib-deflate at the default level.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(TransferError::CompressionFailed)?;
    encoder.finish().map_err(TransferError::CompressionFailed)
}

/// zlib-inflate a complete stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(TransferError::DecompressFailed)?;
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────────
