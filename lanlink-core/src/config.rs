//! Normative protocol constants and per-side tuning knobs.
//!
//! The constants are the wire-protocol contract; the config structs
//! exist so tests and embedders can shorten the deadlines without
//! changing the protocol itself.

use std::time::Duration;

/// Fixed chunk size for the UDP data channel (32 KiB).
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Well-known TCP control port peers listen on.
pub const CONTROL_PORT: u16 = 9200;

/// How long the sender waits for each per-chunk ACK.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Receiver-side tolerance for no UDP traffic (2 x ACK wait).
pub const IDLE_UDP_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Per-read deadline on the receiver's UDP socket.
pub const UDP_READ_DEADLINE: Duration = Duration::from_secs(5);

/// Budget for one whole transfer session, on either side.
pub const OVERALL_TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);

/// TCP connect deadline for the sender dial.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP keep-alive interval on the sender's control socket.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// How many times a chunk is re-sent before the transfer fails.
pub const MAX_RETRIES: u32 = 1;

/// Requested receive-buffer size for the UDP data socket (best effort).
pub const UDP_RECV_BUFFER: usize = 4 * 1024 * 1024;

/// MIME types that are transferred as-is, without zlib compression.
pub const NO_COMPRESSION_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "video/mp4",
    "video/avi",
    "video/mov",
];

/// Whether a MIME type is exempt from compression.
pub fn compression_exempt(mime: &str) -> bool {
    NO_COMPRESSION_TYPES.contains(&mime)
}

/// Number of chunks needed for a payload of `size` bytes.
///
/// Zero only for an empty payload; the final chunk may be short.
pub fn chunk_count(size: usize) -> u32 {
    size.div_ceil(CHUNK_SIZE) as u32
}

// ── SenderConfig ─────────────────────────────────────────────────

/// Tuning for the sender-side state machine.
///
/// Defaults are the normative constants above.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// TCP control port to dial on the receiver.
    pub control_port: u16,
    /// Per-chunk ACK wait.
    pub ack_timeout: Duration,
    /// Whole-session budget.
    pub overall_timeout: Duration,
    /// TCP connect deadline.
    pub connect_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            control_port: CONTROL_PORT,
            ack_timeout: ACK_TIMEOUT,
            overall_timeout: OVERALL_TRANSFER_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

// ── ReceiverConfig ───────────────────────────────────────────────

/// Tuning for the receiver-side state machine.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Per-read deadline on the UDP socket.
    pub udp_read_deadline: Duration,
    /// Cumulative no-traffic tolerance before `error:timeout`.
    pub idle_timeout: Duration,
    /// Whole-session budget measured from the `Start` announce.
    pub overall_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            udp_read_deadline: UDP_READ_DEADLINE,
            idle_timeout: IDLE_UDP_TIMEOUT,
            overall_timeout: OVERALL_TRANSFER_TIMEOUT,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_boundaries() {
        assert_eq!(chunk_count(0), 0);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(CHUNK_SIZE), 1);
        assert_eq!(chunk_count(CHUNK_SIZE + 1), 2);
        assert_eq!(chunk_count(2 * CHUNK_SIZE + 1000), 3);
    }

    #[test]
    fn compression_exemptions() {
        assert!(compression_exempt("image/jpeg"));
        assert!(compression_exempt("video/mp4"));
        assert!(!compression_exempt("application/octet-stream"));
        assert!(!compression_exempt("text/plain"));
        // Exemption is by exact MIME string, not by family.
        assert!(!compression_exempt("image/webp"));
    }

    #[test]
    fn defaults_match_constants() {
        let s = SenderConfig::default();
        assert_eq!(s.control_port, CONTROL_PORT);
        assert_eq!(s.ack_timeout, ACK_TIMEOUT);

        let r = ReceiverConfig::default();
        assert_eq!(r.idle_timeout, IDLE_UDP_TIMEOUT);
        assert_eq!(r.overall_timeout, OVERALL_TRANSFER_TIMEOUT);
    }
}
