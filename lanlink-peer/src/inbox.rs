//! Inbox delivery: the daemon's default downstream sink.
//!
//! Text messages are logged; attachments are written into the inbox
//! directory under a collision-free name.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use lanlink_core::{Message, MessageSink, TransferError};

/// Writes received attachments to a directory and logs text bodies.
#[derive(Debug, Clone)]
pub struct InboxSink {
    dir: PathBuf,
}

impl InboxSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Strip any path components a peer smuggled into the filename.
    fn sanitize(name: &str) -> String {
        let base = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if base.is_empty() || base == "." || base == ".." {
            "unnamed".to_string()
        } else {
            base
        }
    }

    /// First free path for `name` inside the inbox: `name`, then
    /// `name.1`, `name.2`, ...
    fn unique_path(&self, name: &str) -> PathBuf {
        let candidate = self.dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        for i in 1u32.. {
            let candidate = self.dir.join(format!("{name}.{i}"));
            if !candidate.exists() {
                return candidate;
            }
        }
        unreachable!()
    }
}

#[async_trait]
impl MessageSink for InboxSink {
    async fn deliver(&self, message: Message) -> Result<(), TransferError> {
        if message.message_type.is_text() {
            info!(
                sender = %message.sender,
                body = %message.message,
                "text message"
            );
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TransferError::DeliveryFailed(e.to_string()))?;

        for file in &message.payload {
            let path = self.unique_path(&Self::sanitize(&file.name));
            tokio::fs::write(&path, &file.data)
                .await
                .map_err(|e| TransferError::DeliveryFailed(e.to_string()))?;
            info!(
                sender = %message.sender,
                path = %path.display(),
                size = file.data.len(),
                "attachment saved"
            );
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
