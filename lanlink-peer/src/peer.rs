//! The peer daemon: accept loop and per-session handlers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tracing::{info, warn};

use lanlink_core::TransferReceiver;

use crate::config::PeerConfig;
use crate::inbox::InboxSink;

// ── PeerService ──────────────────────────────────────────────────

/// The receiving side of a peer.
///
/// Owns the TCP control listener; each accepted connection becomes
/// one independent session task. A failed session never takes the
/// service down.
pub struct PeerService {
    config: PeerConfig,
    running: Arc<AtomicBool>,
}

impl PeerService {
    /// Create a new peer service with the given config.
    pub fn new(config: PeerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can stop the service from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run the accept loop until stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.network.control_port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("peer listening on {addr}");

        let sink = Arc::new(InboxSink::new(&self.config.inbox.dir));
        let receiver = TransferReceiver::new(sink);

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = listener.accept() => result,
                _ = Self::wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            info!("connection from {peer}");
            let session = receiver.clone();
            tokio::spawn(async move {
                match session.handle(stream, peer).await {
                    Ok(outcome) => info!(%peer, ?outcome, "session complete"),
                    Err(e) => warn!(%peer, error = %e, "session failed"),
                }
            });
        }

        self.running.store(false, Ordering::SeqCst);
        info!("peer service stopped");
        Ok(())
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_creates_with_defaults() {
        let svc = PeerService::new(PeerConfig::default());
        assert!(!svc.is_running());
    }

    #[test]
    fn stop_handle_works() {
        let svc = PeerService::new(PeerConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }
}
