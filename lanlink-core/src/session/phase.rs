//! Per-side transfer phase machines with validated transitions.
//!
//! The async session code drives these as it progresses; an invalid
//! transition returns `Err` instead of panicking, so a logic bug
//! surfaces as a protocol violation rather than silent corruption.

use crate::error::TransferError;

// ── SenderPhase ──────────────────────────────────────────────────

/// Sender-side lifecycle of one transfer session.
///
/// ```text
/// Connecting ─► MetaSent ─► AwaitStart ─► Sending(i) ─► AwaitAck(i)
///                                             ▲              │
///                                             └── retry / ───┘
///                                                  advance
///                             AwaitAck(last) ─► AwaitTerm ─► Done
/// ```
///
/// Any state can drop to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderPhase {
    /// Dialing the receiver's control port. Initial state.
    #[default]
    Connecting,

    /// Metadata line written and flushed.
    MetaSent,

    /// Waiting for the receiver's `Start:<port>` line.
    AwaitStart,

    /// Transmitting chunk `i` on the data channel.
    Sending(u32),

    /// Waiting for `chunk<i>` on the control channel.
    AwaitAck(u32),

    /// All chunks ACKed; waiting for the terminator line.
    AwaitTerm,

    /// Terminator was `stop`. Terminal.
    Done,

    /// Session failed. Terminal.
    Failed,
}

impl SenderPhase {
    /// Transition to `MetaSent`. Valid from `Connecting`.
    pub fn metadata_sent(&mut self) -> Result<(), TransferError> {
        match self {
            Self::Connecting => {
                *self = Self::MetaSent;
                Ok(())
            }
            _ => Err(TransferError::ProtocolViolation(
                "metadata sent outside Connecting",
            )),
        }
    }

    /// Transition to `AwaitStart`. Valid from `MetaSent`.
    pub fn awaiting_start(&mut self) -> Result<(), TransferError> {
        match self {
            Self::MetaSent => {
                *self = Self::AwaitStart;
                Ok(())
            }
            _ => Err(TransferError::ProtocolViolation(
                "awaiting Start outside MetaSent",
            )),
        }
    }

    /// Transition to `Sending(index)`.
    ///
    /// Valid as the first chunk after `AwaitStart`, as a retry of the
    /// same index, or as the advance to the next index after its ACK.
    pub fn sending(&mut self, index: u32) -> Result<(), TransferError> {
        let ok = match *self {
            Self::AwaitStart => index == 1,
            Self::AwaitAck(current) => index == current || index == current + 1,
            _ => false,
        };
        if !ok {
            return Err(TransferError::ProtocolViolation(
                "chunk send out of sequence",
            ));
        }
        *self = Self::Sending(index);
        Ok(())
    }

    /// Transition to `AwaitAck(index)`. Valid from `Sending(index)`.
    pub fn awaiting_ack(&mut self, index: u32) -> Result<(), TransferError> {
        match *self {
            Self::Sending(i) if i == index => {
                *self = Self::AwaitAck(index);
                Ok(())
            }
            _ => Err(TransferError::ProtocolViolation(
                "awaiting ACK outside Sending",
            )),
        }
    }

    /// Transition to `AwaitTerm`. Valid once the last ACK arrived.
    pub fn awaiting_term(&mut self) -> Result<(), TransferError> {
        match self {
            Self::AwaitAck(_) => {
                *self = Self::AwaitTerm;
                Ok(())
            }
            _ => Err(TransferError::ProtocolViolation(
                "awaiting terminator outside AwaitAck",
            )),
        }
    }

    /// Transition to `Done`. Valid from `AwaitTerm`.
    pub fn done(&mut self) -> Result<(), TransferError> {
        match self {
            Self::AwaitTerm => {
                *self = Self::Done;
                Ok(())
            }
            _ => Err(TransferError::ProtocolViolation(
                "done outside AwaitTerm",
            )),
        }
    }

    /// Force-fail from any state.
    pub fn fail(&mut self) {
        *self = Self::Failed;
    }

    /// Whether the session ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

// ── ReceiverPhase ────────────────────────────────────────────────

/// Receiver-side lifecycle of one accepted connection.
///
/// ```text
/// Accepted ─► ReadMeta ─┬─► TextForwarded
///                       └─► UdpBound ─► Started ─► Receiving
///                                ─► Verifying (─► Decompressing) ─► Forwarded
/// ```
///
/// Any state can drop to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverPhase {
    /// Connection accepted. Initial state.
    #[default]
    Accepted,

    /// Metadata line parsed and classified.
    ReadMeta,

    /// Pure text message handed downstream. Terminal.
    TextForwarded,

    /// Session UDP socket bound on an ephemeral port.
    UdpBound,

    /// `Start:<port>` written; budget clock running.
    Started,

    /// Collecting chunks.
    Receiving,

    /// All chunks present; checking the digest.
    Verifying,

    /// Digest verified; inflating the zlib stream.
    Decompressing,

    /// Reassembled message handed downstream. Terminal.
    Forwarded,

    /// Session failed. Terminal.
    Failed,
}

impl ReceiverPhase {
    /// Valid from `Accepted`.
    pub fn meta_read(&mut self) -> Result<(), TransferError> {
        self.step(Self::Accepted, Self::ReadMeta, "metadata outside Accepted")
    }

    /// Valid from `ReadMeta`.
    pub fn text_forwarded(&mut self) -> Result<(), TransferError> {
        self.step(
            Self::ReadMeta,
            Self::TextForwarded,
            "text forward outside ReadMeta",
        )
    }

    /// Valid from `ReadMeta`.
    pub fn udp_bound(&mut self) -> Result<(), TransferError> {
        self.step(Self::ReadMeta, Self::UdpBound, "UDP bind outside ReadMeta")
    }

    /// Valid from `UdpBound`.
    pub fn started(&mut self) -> Result<(), TransferError> {
        self.step(Self::UdpBound, Self::Started, "Start outside UdpBound")
    }

    /// Valid from `Started`.
    pub fn receiving(&mut self) -> Result<(), TransferError> {
        self.step(Self::Started, Self::Receiving, "receive outside Started")
    }

    /// Valid from `Receiving`.
    pub fn verifying(&mut self) -> Result<(), TransferError> {
        self.step(Self::Receiving, Self::Verifying, "verify outside Receiving")
    }

    /// Valid from `Verifying`.
    pub fn decompressing(&mut self) -> Result<(), TransferError> {
        self.step(
            Self::Verifying,
            Self::Decompressing,
            "decompress outside Verifying",
        )
    }

    /// Valid from `Verifying` or `Decompressing`.
    pub fn forwarded(&mut self) -> Result<(), TransferError> {
        match self {
            Self::Verifying | Self::Decompressing => {
                *self = Self::Forwarded;
                Ok(())
            }
            _ => Err(TransferError::ProtocolViolation(
                "forward outside Verifying/Decompressing",
            )),
        }
    }

    /// Force-fail from any state.
    pub fn fail(&mut self) {
        *self = Self::Failed;
    }

    /// Whether the session ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TextForwarded | Self::Forwarded | Self::Failed)
    }

    fn step(
        &mut self,
        from: Self,
        to: Self,
        msg: &'static str,
    ) -> Result<(), TransferError> {
        if *self == from {
            *self = to;
            Ok(())
        } else {
            Err(TransferError::ProtocolViolation(msg))
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_happy_path() {
        let mut p = SenderPhase::default();
        p.metadata_sent().unwrap();
        p.awaiting_start().unwrap();
        p.sending(1).unwrap();
        p.awaiting_ack(1).unwrap();
        p.sending(2).unwrap();
        p.awaiting_ack(2).unwrap();
        p.awaiting_term().unwrap();
        p.done().unwrap();
        assert!(p.is_terminal());
    }

    #[test]
    fn sender_retry_keeps_index() {
        let mut p = SenderPhase::default();
        p.metadata_sent().unwrap();
        p.awaiting_start().unwrap();
        p.sending(1).unwrap();
        p.awaiting_ack(1).unwrap();
        // Resend of the same chunk after a lost ACK.
        p.sending(1).unwrap();
        p.awaiting_ack(1).unwrap();
        assert_eq!(p, SenderPhase::AwaitAck(1));
    }

    #[test]
    fn sender_cannot_skip_chunks() {
        let mut p = SenderPhase::default();
        p.metadata_sent().unwrap();
        p.awaiting_start().unwrap();
        p.sending(1).unwrap();
        p.awaiting_ack(1).unwrap();
        assert!(p.sending(3).is_err());
    }

    #[test]
    fn sender_first_chunk_must_be_one() {
        let mut p = SenderPhase::default();
        p.metadata_sent().unwrap();
        p.awaiting_start().unwrap();
        assert!(p.sending(2).is_err());
    }

    #[test]
    fn sender_fail_from_anywhere() {
        let mut p = SenderPhase::AwaitAck(5);
        p.fail();
        assert_eq!(p, SenderPhase::Failed);
        assert!(p.is_terminal());
    }

    #[test]
    fn receiver_file_path() {
        let mut p = ReceiverPhase::default();
        p.meta_read().unwrap();
        p.udp_bound().unwrap();
        p.started().unwrap();
        p.receiving().unwrap();
        p.verifying().unwrap();
        p.decompressing().unwrap();
        p.forwarded().unwrap();
        assert!(p.is_terminal());
    }

    #[test]
    fn receiver_uncompressed_skips_decompress() {
        let mut p = ReceiverPhase::Verifying;
        p.forwarded().unwrap();
        assert_eq!(p, ReceiverPhase::Forwarded);
    }

    #[test]
    fn receiver_text_path() {
        let mut p = ReceiverPhase::default();
        p.meta_read().unwrap();
        p.text_forwarded().unwrap();
        assert!(p.is_terminal());
    }

    #[test]
    fn receiver_invalid_transitions() {
        let mut p = ReceiverPhase::default();
        assert!(p.started().is_err());
        assert!(p.verifying().is_err());
        p.meta_read().unwrap();
        assert!(p.meta_read().is_err());
    }
}
