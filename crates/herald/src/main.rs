//! # herald
//!
//! Herald server binary: loads settings, installs logging, and runs the
//! WebSocket gateway until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use herald_server::{
    CommandRegistry, FanOut, HeraldServer, ServerConfig, StaticTokenAuthenticator,
};
use herald_settings::HeraldSettings;

/// Herald pub/sub server.
#[derive(Parser, Debug)]
#[command(name = "herald", about = "Herald pub/sub server")]
struct Cli {
    /// Settings file (defaults to `~/.herald/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter directive (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Deliver published messages back to the publisher.
    #[arg(long)]
    echo_to_sender: bool,
}

impl Cli {
    fn apply(&self, settings: &mut HeraldSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.echo_to_sender {
            settings.publish.echo_to_sender = true;
        }
    }
}

fn load(cli: &Cli) -> Result<HeraldSettings> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(herald_settings::settings_path);
    let mut settings = herald_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;
    herald_core::logging::init_subscriber(&settings.logging.level);

    let authenticator = StaticTokenAuthenticator::from_settings(&settings.auth);
    if authenticator.is_empty() {
        tracing::warn!("no auth tokens configured, AUTH will reject every client");
    }
    let fanout = FanOut::from_echo(settings.publish.echo_to_sender);
    let registry = CommandRegistry::standard(Arc::new(authenticator), fanout);
    tracing::info!(opcodes = ?registry.opcodes(), ?fanout, "command registry ready");

    let server = HeraldServer::new(ServerConfig::from_settings(&settings), registry);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(%addr, "herald started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("shutdown requested");

    if !server.shutdown().drain(vec![handle], None).await {
        tracing::warn!("server did not stop cleanly");
    }
    tracing::info!("herald stopped");
    Ok(())
}
