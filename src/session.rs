//! Scanner session — wires the host process to the scan engine.
//!
//! Host events drive activation and input; frame changes are published
//! back so the host can draw the crosshair.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::actions::{QrActions, SystemClipboard};
use crate::config::{AppConfig, ConfigError};
use crate::host::protocol::QR_FRAME_CHANGED;
use crate::host::{HostConnection, HostError, HostEvent, HostProcess, HostSignal};
use crate::scanner::{Frame, InputEvent, QrScanEngine, WindowSize};

const INPUT_BUFFER: usize = 128;

/// Runs one scanner session until the host shuts down or disconnects.
pub async fn run_session(config: AppConfig) -> Result<(), SessionError> {
    let start = std::time::Instant::now();
    let (host, events) = HostProcess::spawn(&config.host)?;
    let connection = host.connection();

    let (active_tx, active_rx) = watch::channel(false);
    let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);

    let actions = QrActions::new(Arc::clone(&connection), SystemClipboard);
    let engine = Arc::new(QrScanEngine::new(
        config.scanner,
        WindowSize::default(),
        active_rx,
        Arc::clone(&connection),
        actions,
    )?);

    let frames = tokio::spawn(forward_frames(
        engine.subscribe_frame(),
        Arc::clone(&connection),
    ));
    let driver = tokio::spawn(Arc::clone(&engine).run(input_rx));

    pump_host_events(events, &active_tx, &input_tx).await;

    drop(input_tx);
    if let Err(e) = driver.await {
        log::error!("[QR] Cadence driver panicked: {}", e);
    }
    frames.abort();
    host.shutdown().await?;

    log::info!("Session ended after {}s", start.elapsed().as_secs());
    Ok(())
}

/// Routes host events until `shutdown` or the end of the stream.
pub async fn pump_host_events(
    mut events: mpsc::Receiver<HostEvent>,
    active: &watch::Sender<bool>,
    inputs: &mpsc::Sender<InputEvent>,
) {
    while let Some(event) = events.recv().await {
        match HostSignal::from(event) {
            HostSignal::Activate(on) => {
                active.send_replace(on);
            }
            HostSignal::Input(input) => {
                if inputs.send(input).await.is_err() {
                    log::warn!("[QR] Engine stopped accepting input");
                    return;
                }
            }
            HostSignal::Shutdown => {
                log::info!("[HOST] Shutdown requested");
                return;
            }
        }
    }
}

async fn forward_frames(mut frames: watch::Receiver<Frame>, connection: Arc<HostConnection>) {
    while frames.changed().await.is_ok() {
        let frame = *frames.borrow_and_update();
        if let Err(e) = connection.emit(QR_FRAME_CHANGED, frame).await {
            log::warn!("[HOST] Failed to publish frame: {}", e);
            if matches!(e, HostError::Io(_) | HostError::Closed) {
                return;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_activation_and_input_until_shutdown() {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (active_tx, active_rx) = watch::channel(false);
        let (input_tx, mut input_rx) = mpsc::channel(8);

        events_tx.send(HostEvent::OverlayShown).await.unwrap();
        events_tx
            .send(HostEvent::PointerMoved { x: 5.0, y: 6.0 })
            .await
            .unwrap();
        events_tx.send(HostEvent::Shutdown).await.unwrap();
        events_tx.send(HostEvent::PointerUp).await.unwrap();

        pump_host_events(events_rx, &active_tx, &input_tx).await;

        assert!(*active_rx.borrow());
        assert_eq!(
            input_rx.try_recv().unwrap(),
            InputEvent::PointerMoved { x: 5.0, y: 6.0 }
        );
        // Nothing after shutdown is routed.
        assert!(input_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stops_when_host_stream_ends() {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (active_tx, active_rx) = watch::channel(true);
        let (input_tx, _input_rx) = mpsc::channel(8);

        events_tx.send(HostEvent::OverlayHidden).await.unwrap();
        drop(events_tx);

        pump_host_events(events_rx, &active_tx, &input_tx).await;
        assert!(!*active_rx.borrow());
    }
}
