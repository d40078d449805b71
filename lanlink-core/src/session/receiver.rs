//! Receiver-side transfer state machine.
//!
//! One accepted control connection is one session. The handler reads
//! and classifies the metadata line, short-circuits pure text to the
//! sink, and otherwise runs the UDP receive loop under the session
//! deadlines. After the metadata line parses, every terminal path
//! writes exactly one terminator before the sockets close; the only
//! terminator-less exit is a malformed metadata line.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::config::{ReceiverConfig, compression_exempt};
use crate::control::{ControlCodec, ControlLine, Terminator};
use crate::data::bind_session_socket;
use crate::error::TransferError;
use crate::forward::MessageSink;
use crate::framer::inflate;
use crate::message::{FileMetadata, FilePayload, Message, MessageKind};
use crate::packet::{ChunkPacket, MAX_DATAGRAM_SIZE};
use crate::reassembly::{ChunkOutcome, Reassembler};
use crate::session::phase::ReceiverPhase;

type Control = Framed<TcpStream, ControlCodec>;

// ── SessionOutcome ───────────────────────────────────────────────

/// How a successful session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A pure text message was forwarded.
    Text,
    /// A file was reassembled, verified and forwarded.
    File {
        /// Attachment filename.
        name: String,
        /// Delivered (post-inflate) byte count.
        size: usize,
    },
}

// ── TransferReceiver ─────────────────────────────────────────────

/// Handles accepted control connections and forwards reassembled
/// messages to the sink.
pub struct TransferReceiver<S> {
    config: ReceiverConfig,
    sink: Arc<S>,
}

impl<S> Clone for TransferReceiver<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: MessageSink> TransferReceiver<S> {
    /// Receiver with the normative protocol timeouts.
    pub fn new(sink: Arc<S>) -> Self {
        Self::with_config(sink, ReceiverConfig::default())
    }

    /// Receiver with explicit tuning (tests, embedders).
    pub fn with_config(sink: Arc<S>, config: ReceiverConfig) -> Self {
        Self { config, sink }
    }

    /// Run one session on an accepted control connection.
    pub async fn handle(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<SessionOutcome, TransferError> {
        let mut phase = ReceiverPhase::default();
        let mut control = Framed::new(stream, ControlCodec);

        // Metadata line. A malformed line closes the connection with
        // no terminator.
        let line = match timeout(self.config.overall_timeout, control.next()).await {
            Err(_) => return Err(TransferError::Timeout),
            Ok(None) => {
                return Err(TransferError::ProtocolViolation(
                    "connection closed before metadata",
                ));
            }
            Ok(Some(line)) => line?,
        };
        phase.meta_read()?;

        let meta = match line {
            ControlLine::Text(message) => {
                info!(%peer, sender = %message.sender, "text message received");
                self.sink.deliver(message).await?;
                phase.text_forwarded()?;
                return Ok(SessionOutcome::Text);
            }
            ControlLine::File(meta) => meta,
            _ => {
                return Err(TransferError::ProtocolViolation(
                    "expected a metadata line",
                ));
            }
        };

        info!(
            %peer,
            name = %meta.name,
            size = meta.size,
            chunks = meta.chunks,
            sender = %meta.sender,
            "incoming file"
        );

        match self.run_file_session(&mut control, &meta, &mut phase).await {
            Ok(bytes) => {
                control.send(ControlLine::Term(Terminator::Stop)).await?;
                let size = bytes.len();
                let message = delivered_message(&meta, bytes);
                if let Err(e) = self.sink.deliver(message).await {
                    warn!(%peer, error = %e, "downstream delivery failed");
                }
                phase.forwarded()?;
                info!(%peer, name = %meta.name, size, "file forwarded");
                Ok(SessionOutcome::File {
                    name: meta.name,
                    size,
                })
            }
            Err(err) => {
                let term = err.terminator();
                if let Err(send_err) = control.send(ControlLine::Term(term)).await {
                    warn!(%peer, error = %send_err, "failed to write terminator");
                }
                phase.fail();
                Err(err)
            }
        }
    }

    /// Bind, announce, collect, verify. Any `Err` from here becomes
    /// a terminator line in `handle`.
    async fn run_file_session(
        &self,
        control: &mut Control,
        meta: &FileMetadata,
        phase: &mut ReceiverPhase,
    ) -> Result<Vec<u8>, TransferError> {
        let mut reassembler = Reassembler::new(meta)?;

        let udp = bind_session_socket()?;
        let port = udp.local_addr()?.port();
        phase.udp_bound()?;

        control.send(ControlLine::Start(port)).await?;
        phase.started()?;
        debug!(port, "session port announced");

        let started = Instant::now();
        let mut last_packet = Instant::now();
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        phase.receiving()?;
        while !reassembler.is_complete() {
            if started.elapsed() >= self.config.overall_timeout {
                return Err(TransferError::Timeout);
            }

            let n = match timeout(self.config.udp_read_deadline, udp.recv_from(&mut buf)).await {
                Err(_) => {
                    if last_packet.elapsed() >= self.config.idle_timeout {
                        return Err(TransferError::Timeout);
                    }
                    continue;
                }
                Ok(Err(e)) => return Err(TransferError::UdpRead(e)),
                Ok(Ok((n, _from))) => n,
            };

            // Short or malformed datagrams never advance the session.
            let packet = match ChunkPacket::decode(&buf[..n]) {
                Ok(p) => p,
                Err(_) => continue,
            };

            match reassembler.accept(&packet) {
                ChunkOutcome::Accepted(idx) => {
                    last_packet = Instant::now();
                    control.send(ControlLine::Ack(idx)).await?;
                    debug!(
                        chunk = idx,
                        received = reassembler.received_count(),
                        total = meta.chunks,
                        "chunk stored"
                    );
                }
                ChunkOutcome::Duplicate(idx) => {
                    // Re-ACK so a retransmitting sender can advance.
                    last_packet = Instant::now();
                    control.send(ControlLine::Ack(idx)).await?;
                    debug!(chunk = idx, "duplicate chunk re-acked");
                }
                ChunkOutcome::Ignored => {}
                ChunkOutcome::TotalMismatch => {
                    return Err(TransferError::ReceiveFailed(
                        "chunk total disagrees with metadata",
                    ));
                }
            }
        }

        phase.verifying()?;
        let raw = reassembler.into_verified()?;

        if compression_exempt(&meta.mime) {
            Ok(raw)
        } else {
            phase.decompressing()?;
            inflate(&raw)
        }
    }
}

/// Shape the reassembled bytes back into a `Message` for the sink.
fn delivered_message(meta: &FileMetadata, bytes: Vec<u8>) -> Message {
    Message {
        sender: meta.sender.clone(),
        receiver: meta.receiver,
        message_type: MessageKind::from_mime(&meta.mime),
        message: meta.message.clone(),
        payload: vec![FilePayload::new(
            meta.name.clone(),
            meta.mime.clone(),
            bytes,
        )],
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn delivered_message_carries_reassembled_bytes() {
        let meta = FileMetadata {
            name: "cat.jpg".into(),
            mime: "image/jpeg".into(),
            size: 3,
            chunks: 1,
            hash: "00".repeat(32),
            sender: "alice".into(),
            receiver: Ipv4Addr::new(10, 0, 0, 7),
            message: "look".into(),
        };
        let msg = delivered_message(&meta, vec![1, 2, 3]);
        assert_eq!(msg.message_type, MessageKind::Image);
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.message, "look");
        assert_eq!(msg.payload.len(), 1);
        assert_eq!(msg.payload[0].data, vec![1, 2, 3]);
        assert_eq!(msg.payload[0].mime, "image/jpeg");
    }
}
