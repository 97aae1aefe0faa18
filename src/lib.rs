//! Snap QR — overlay QR scanner.
//!
//! This is the session shell that wires together:
//! - Scan engine: viewport, admission, dedup (scanner/)
//! - Native host boundary over stdio (host/)
//! - What to do with a decoded payload (actions/)
//! - Configuration (config.rs)

pub mod actions;
pub mod config;
pub mod host;
pub mod scanner;
pub mod session;

use config::AppConfig;
pub use session::SessionError;

/// Entry point — called by `main`.
pub fn run() -> Result<(), SessionError> {
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "Snap QR starting up (host: {}, cadence {}ms)",
        config.host.command.display(),
        config.scanner.scan_interval_ms
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(SessionError::Runtime)?;

    runtime.block_on(session::run_session(config))
}
