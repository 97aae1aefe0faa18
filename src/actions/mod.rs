//! What happens to a decoded QR payload.
//!
//! Web links are opened through the host, everything else (and any link
//! the host fails to open) is copied to the clipboard. The overlay is
//! closed afterwards either way.

mod clipboard;
mod url;

pub use clipboard::{ClipboardError, ClipboardWriter, SystemClipboard};
pub use url::normalize_http_url;

use crate::host::{NotificationPayload, OverlayHost};
use crate::scanner::ScanHandler;

pub struct QrActions<O, C> {
    host: O,
    clipboard: C,
}

impl<O, C> QrActions<O, C>
where
    O: OverlayHost,
    C: ClipboardWriter,
{
    pub fn new(host: O, clipboard: C) -> Self {
        Self { host, clipboard }
    }

    async fn copy_payload(&self, payload: &str) {
        if let Err(e) = self.clipboard.write_text(payload.to_string()).await {
            log::error!("[ACTIONS] Failed to copy QR payload: {}", e);
            return;
        }
        if let Err(e) = self.host.notify(NotificationPayload::qr_copied(payload)).await {
            log::warn!("[ACTIONS] Notification failed: {}", e);
        }
    }
}

impl<O, C> ScanHandler for QrActions<O, C>
where
    O: OverlayHost,
    C: ClipboardWriter,
{
    async fn on_scan_success(&self, payload: &str) {
        match normalize_http_url(payload) {
            Some(url) => match self.host.open_url(&url).await {
                Ok(()) => {
                    log::info!("[ACTIONS] Opened {}", url);
                    if let Err(e) = self.host.notify(NotificationPayload::qr_opened(&url)).await {
                        log::warn!("[ACTIONS] Notification failed: {}", e);
                    }
                }
                Err(e) => {
                    log::error!("[ACTIONS] Failed to open QR URL: {}", e);
                    self.copy_payload(payload).await;
                }
            },
            None => self.copy_payload(payload).await,
        }

        if let Err(e) = self.host.close_overlay().await {
            log::warn!("[ACTIONS] Failed to close overlay: {}", e);
        }
    }
}
