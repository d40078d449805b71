//! Downstream delivery seam.
//!
//! The core hands every successfully received message to a
//! [`MessageSink`]; how the bytes reach the local application
//! (HTTP, pipe, in-process) is the embedder's concern.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransferError;
use crate::message::Message;

/// Consumer of reassembled messages.
///
/// Called strictly after hash verification (and decompression, when
/// it applies).
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), TransferError>;
}

// ── ChannelSink ──────────────────────────────────────────────────

/// A sink that forwards messages into an mpsc channel.
///
/// The embedder keeps the receiving half; useful for in-process
/// consumers and for tests.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Message>,
}

impl ChannelSink {
    /// Create a sink and the channel receiver it feeds.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn deliver(&self, message: Message) -> Result<(), TransferError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| TransferError::DeliveryFailed("message channel closed".into()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
