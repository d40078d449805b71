//! Configuration for the peer daemon.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Inbox delivery settings.
    pub inbox: InboxConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP control port to listen on.
    pub control_port: u16,
}

/// Where received attachments land.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Directory for received files (created on demand).
    pub dir: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            control_port: lanlink_core::CONTROL_PORT,
        }
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            dir: "inbox".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl PeerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = PeerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("control_port"));
        assert!(text.contains("dir"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = PeerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PeerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.control_port, lanlink_core::CONTROL_PORT);
        assert_eq!(parsed.inbox.dir, "inbox");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: PeerConfig = toml::from_str("[network]\ncontrol_port = 9300\n").unwrap();
        assert_eq!(parsed.network.control_port, 9300);
        assert_eq!(parsed.logging.level, "info");
    }
}
