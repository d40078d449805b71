//! lanlink-peer — entry point.
//!
//! ```text
//! lanlink-peer run                       Run the receiving daemon
//! lanlink-peer run --config <path>       Load a custom config TOML
//! lanlink-peer send --to <ip> --message "hi"
//! lanlink-peer send --to <ip> --file photo.jpg --mime image/jpeg
//! lanlink-peer gen-config                Write default config to stdout
//! ```

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lanlink_core::{FilePayload, Message, SenderConfig, TransferSender};
use lanlink_peer::config::PeerConfig;
use lanlink_peer::peer::PeerService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lanlink-peer", about = "LAN message and file transfer peer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the receiving daemon.
    Run {
        /// Path to configuration TOML file.
        #[arg(short, long, default_value = "lanlink-peer.toml")]
        config: PathBuf,
    },

    /// Send a text message or a file to a peer.
    Send {
        /// Destination peer IPv4 address.
        #[arg(long)]
        to: Ipv4Addr,

        /// Sender identifier shown to the peer.
        #[arg(long, default_value = "lanlink")]
        sender: String,

        /// Text body. Without --file this is a pure text message.
        #[arg(long)]
        message: Option<String>,

        /// File to transfer.
        #[arg(long)]
        file: Option<PathBuf>,

        /// MIME type of --file.
        #[arg(long, default_value = "application/octet-stream")]
        mime: String,

        /// Control port of the peer.
        #[arg(long, default_value_t = lanlink_core::CONTROL_PORT)]
        port: u16,
    },

    /// Print the default configuration to stdout and exit.
    GenConfig,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            let text = toml::to_string_pretty(&PeerConfig::default())?;
            println!("{text}");
            Ok(())
        }
        Command::Run { config } => run_daemon(&config).await,
        Command::Send {
            to,
            sender,
            message,
            file,
            mime,
            port,
        } => send(to, sender, message, file, mime, port).await,
    }
}

async fn run_daemon(config_path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = PeerConfig::load(config_path);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("lanlink-peer v{}", env!("CARGO_PKG_VERSION"));
    info!("control port: {}", config.network.control_port);
    info!("inbox: {}", config.inbox.dir);

    let service = PeerService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await
}

async fn send(
    to: Ipv4Addr,
    sender: String,
    message: Option<String>,
    file: Option<PathBuf>,
    mime: String,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let msg = match (&file, &message) {
        (Some(path), body) => {
            let data = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string());
            let mut msg = Message::with_file(sender, to, FilePayload::new(name, mime, data));
            msg.message = body.clone().unwrap_or_default();
            msg
        }
        (None, Some(body)) => Message::text(sender, to, body.clone()),
        (None, None) => {
            eprintln!("nothing to send: pass --message and/or --file");
            std::process::exit(2);
        }
    };

    let tx = TransferSender::with_config(SenderConfig {
        control_port: port,
        ..SenderConfig::default()
    });
    tx.send(&msg).await?;
    println!("sent to {to}");
    Ok(())
}
