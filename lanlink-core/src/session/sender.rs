//! Sender-side transfer state machine.
//!
//! One session per attached file: dial the receiver's control port,
//! announce the metadata, wait for the UDP rendezvous port, then
//! stop-and-wait each chunk against its control-channel ACK. A text
//! message is a single metadata line with no data channel at all.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::config::{KEEPALIVE_INTERVAL, MAX_RETRIES, SenderConfig};
use crate::control::{ControlCodec, ControlLine, Terminator};
use crate::data::connect_session_socket;
use crate::error::TransferError;
use crate::framer::{frame_file, metadata_for};
use crate::message::{FilePayload, Message};
use crate::packet::ChunkPacket;
use crate::session::phase::SenderPhase;

type Control = Framed<TcpStream, ControlCodec>;

// ── TransferSender ───────────────────────────────────────────────

/// Drives outgoing transfers.
#[derive(Debug, Clone, Default)]
pub struct TransferSender {
    config: SenderConfig,
}

impl TransferSender {
    /// Sender with the normative protocol timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender with explicit tuning (tests, embedders).
    pub fn with_config(config: SenderConfig) -> Self {
        Self { config }
    }

    /// Transmit one logical message.
    ///
    /// A text message is a single control-line session. A message
    /// with several attachments runs one full session per file,
    /// sequentially; the first failure aborts the remainder.
    pub async fn send(&self, msg: &Message) -> Result<(), TransferError> {
        msg.validate()?;

        if msg.message_type.is_text() {
            return self.send_text(msg).await;
        }
        for file in &msg.payload {
            self.send_file(msg, file).await?;
        }
        Ok(())
    }

    // ── Text path ────────────────────────────────────────────────

    async fn send_text(&self, msg: &Message) -> Result<(), TransferError> {
        let stream = self.dial(msg).await?;
        let mut control = Framed::new(stream, ControlCodec);
        control.send(ControlLine::Text(msg.clone())).await?;
        info!(receiver = %msg.receiver, "text message sent");
        Ok(())
    }

    // ── File path ────────────────────────────────────────────────

    async fn send_file(&self, msg: &Message, file: &FilePayload) -> Result<(), TransferError> {
        let framed = frame_file(file)?;
        let meta = metadata_for(&msg.sender, msg.receiver, &msg.message, file, &framed);

        let mut phase = SenderPhase::default();
        let stream = self.dial(msg).await?;
        let deadline = Instant::now() + self.config.overall_timeout;
        let mut control = Framed::new(stream, ControlCodec);

        control.send(ControlLine::File(meta)).await?;
        phase.metadata_sent()?;
        debug!(
            name = %file.name,
            size = framed.bytes().len(),
            chunks = framed.chunks(),
            "metadata announced"
        );

        phase.awaiting_start()?;
        let port = match read_line(&mut control, deadline).await {
            Ok(ControlLine::Start(port)) => port,
            Ok(_) => {
                phase.fail();
                return Err(TransferError::ProtocolViolation("expected Start line"));
            }
            Err(e) => {
                phase.fail();
                return Err(e);
            }
        };

        let peer = SocketAddr::from((msg.receiver, port));
        let udp = connect_session_socket(peer).await?;

        for index in 1..=framed.chunks() {
            let packet = ChunkPacket::new(
                framed.digest(),
                index,
                framed.chunks(),
                framed.chunk(index).to_vec(),
            )?;
            let datagram = packet.encode();

            let mut attempts = 0u32;
            loop {
                phase.sending(index)?;
                udp.send(&datagram).await?;
                attempts += 1;
                phase.awaiting_ack(index)?;

                match timeout(self.config.ack_timeout, control.next()).await {
                    Ok(Some(Ok(ControlLine::Ack(i)))) if i == index => break,
                    Ok(Some(Ok(ControlLine::Term(term)))) => {
                        // The receiver gave up mid-transfer.
                        phase.fail();
                        return Err(term.into_error().unwrap_or(
                            TransferError::ProtocolViolation("premature stop terminator"),
                        ));
                    }
                    Ok(Some(Ok(other))) => {
                        debug!(chunk = index, line = ?other, "unexpected line while awaiting ACK");
                    }
                    Ok(Some(Err(e))) => {
                        phase.fail();
                        return Err(e);
                    }
                    Ok(None) => {
                        phase.fail();
                        return Err(TransferError::ProtocolViolation(
                            "control channel closed mid-transfer",
                        ));
                    }
                    Err(_) => {
                        debug!(chunk = index, "ACK wait timed out");
                    }
                }

                if attempts > MAX_RETRIES {
                    phase.fail();
                    return Err(TransferError::AckExhausted {
                        chunk: index,
                        attempts,
                    });
                }
            }
        }

        phase.awaiting_term()?;
        match read_line(&mut control, deadline).await {
            Ok(ControlLine::Term(Terminator::Stop)) => {
                phase.done()?;
                info!(
                    receiver = %msg.receiver,
                    name = %file.name,
                    chunks = framed.chunks(),
                    "transfer complete"
                );
                Ok(())
            }
            Ok(ControlLine::Term(term)) => {
                phase.fail();
                Err(term
                    .into_error()
                    .unwrap_or(TransferError::ProtocolViolation("impossible terminator")))
            }
            Ok(_) => {
                phase.fail();
                Err(TransferError::ProtocolViolation("expected terminator line"))
            }
            Err(e) => {
                phase.fail();
                Err(e)
            }
        }
    }

    // ── Dial ─────────────────────────────────────────────────────

    /// Open the control connection: 10 s connect deadline, then
    /// nodelay and a 30 s keep-alive (both best effort).
    async fn dial(&self, msg: &Message) -> Result<TcpStream, TransferError> {
        let addr = SocketAddr::from((msg.receiver, self.config.control_port));
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                TransferError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect deadline exceeded",
                ))
            })?
            .map_err(TransferError::ConnectFailed)?;

        let _ = stream.set_nodelay(true);
        let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
        let _ = SockRef::from(&stream).set_tcp_keepalive(&keepalive);

        Ok(stream)
    }
}

/// Read one control line against the session deadline.
async fn read_line(control: &mut Control, deadline: Instant) -> Result<ControlLine, TransferError> {
    match timeout_at(deadline, control.next()).await {
        Err(_) => Err(TransferError::Timeout),
        Ok(None) => Err(TransferError::ProtocolViolation("control channel closed")),
        Ok(Some(line)) => line,
    }
}
