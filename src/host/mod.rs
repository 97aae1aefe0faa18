//! Native host boundary — public API.
//!
//! Pixel capture, QR decoding, URL opening, notifications and window
//! management live in an external host process. This module owns the
//! request/response and publish/subscribe channel to it.

mod connection;
mod process;
pub mod protocol;

pub use connection::HostConnection;
pub use process::HostProcess;
pub use protocol::{HostEvent, HostSignal, NotificationPayload};

use std::future::Future;
use std::sync::Arc;

use crate::scanner::CaptureRegion;

/// Decodes whatever QR code is visible inside a screen region.
///
/// `Ok(None)` means the host looked and found nothing.
pub trait RegionDecoder: Send + Sync {
    fn decode_region(
        &self,
        region: CaptureRegion,
    ) -> impl Future<Output = Result<Option<String>, HostError>> + Send;
}

/// Overlay-side operations the success actions rely on.
pub trait OverlayHost: Send + Sync {
    fn open_url(&self, url: &str) -> impl Future<Output = Result<(), HostError>> + Send;

    fn notify(
        &self,
        notification: NotificationPayload,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn close_overlay(&self) -> impl Future<Output = Result<(), HostError>> + Send;
}

impl<T: RegionDecoder> RegionDecoder for Arc<T> {
    fn decode_region(
        &self,
        region: CaptureRegion,
    ) -> impl Future<Output = Result<Option<String>, HostError>> + Send {
        (**self).decode_region(region)
    }
}

impl<T: OverlayHost> OverlayHost for Arc<T> {
    fn open_url(&self, url: &str) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).open_url(url)
    }

    fn notify(
        &self,
        notification: NotificationPayload,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).notify(notification)
    }

    fn close_overlay(&self) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).close_overlay()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Host executable not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn host: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Host I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode host request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Unexpected host response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Host returned an error: {0}")]
    Remote(String),

    #[error("Host connection closed")]
    Closed,
}
