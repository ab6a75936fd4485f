//! # Call Recorder - Main Application Entry Point
//!
//! Wires the recorder together:
//! 1. **Loads configuration** from the config file and environment variables
//! 2. **Sets up logging** with `tracing`
//! 3. **Binds the UDP socket** that receives audio frames
//! 4. **Runs the recorder** until the socket closes or a shutdown signal arrives
//!
//! An open call is always finalized before the process exits.

use anyhow::{Context, Result};
use call_recorder::audio::layout::RecordingLayout;
use call_recorder::audio::session::SessionManager;
use call_recorder::audio::sink::WavSinkFactory;
use call_recorder::config::AppConfig;
use call_recorder::packet::PacketIngestor;
use call_recorder::recorder::CallRecorder;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // It's fine if there's no .env file
    dotenv::dotenv().ok();

    init_tracing()?;

    let config_path = AppConfig::resolve_path(std::env::args().nth(1));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from '{}'", config_path))?;
    config.validate()?;

    info!("Starting call-recorder v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}, recordings under {}",
        config.receive_udp.address, config.receive_udp.port, config.log_path
    );

    let ingestor = PacketIngestor::bind(&config.receive_udp.address, config.receive_udp.port).await?;

    let sessions = SessionManager::new(
        RecordingLayout::new(&config.log_path),
        Box::new(WavSinkFactory),
    );
    let summary = CallRecorder::new(sessions)
        .run(ingestor.into_records(), shutdown_signal())
        .await;

    info!(
        calls = summary.calls,
        frames = summary.frames,
        failed_calls = summary.failed_calls,
        "Recorder stopped gracefully"
    );
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "call_recorder=debug")
/// - If not set, defaults to "call_recorder=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "call_recorder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C elsewhere).
///
/// If a handler cannot be installed the error is logged and only the remaining
/// signal ends the recorder.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => Some(sigterm),
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                None
            }
        };

        tokio::select! {
            _ = async {
                match sigterm.as_mut() {
                    Some(sigterm) => { sigterm.recv().await; }
                    None => std::future::pending::<()>().await,
                }
            } => info!("Received SIGTERM"),
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Received SIGINT"),
                Err(e) => {
                    error!("Failed to listen for SIGINT: {}", e);
                    std::future::pending::<()>().await;
                }
            },
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
    }
}
