//! # lanlink-core
//!
//! Peer-to-peer message and file transfer for local subnets.
//!
//! A transfer couples two channels: a reliable TCP control socket
//! (metadata line, `Start:<port>` rendezvous, per-chunk ACKs, one
//! terminator) and a UDP data socket carrying fixed-size chunk
//! datagrams. ACKs never travel over UDP and payload never travels
//! over TCP; the sender is strict stop-and-wait at chunk grain.
//!
//! This crate contains:
//! - **Data model**: `Message`, `FilePayload`, `FileMetadata`, `MessageKind`
//! - **Framing**: sender-side compression, hashing and chunking
//! - **Control**: the line grammar (`ControlLine`) and `ControlCodec`
//! - **Data**: session UDP socket construction
//! - **Reassembly**: index-addressed chunk collection and verification
//! - **Session**: the sender and receiver state machines
//! - **Forward**: the `MessageSink` delivery seam
//! - **Error**: `TransferError`, a typed `thiserror` hierarchy

pub mod config;
pub mod control;
pub mod data;
pub mod error;
pub mod forward;
pub mod framer;
pub mod message;
pub mod packet;
pub mod reassembly;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use config::{
    ACK_TIMEOUT, CHUNK_SIZE, CONTROL_PORT, IDLE_UDP_TIMEOUT, MAX_RETRIES,
    OVERALL_TRANSFER_TIMEOUT, ReceiverConfig, SenderConfig,
};
pub use control::{ControlCodec, ControlLine, Terminator};
pub use error::TransferError;
pub use forward::{ChannelSink, MessageSink};
pub use framer::{FramedPayload, frame_file};
pub use message::{FileMetadata, FilePayload, Message, MessageKind};
pub use packet::{CHUNK_HEADER_SIZE, ChunkPacket, MAX_DATAGRAM_SIZE};
pub use reassembly::{ChunkOutcome, Reassembler};
pub use session::{SessionOutcome, TransferReceiver, TransferSender};
