//! System clipboard access via `arboard`.
//!
//! arboard calls block and some backends are not `Send`, so each write
//! builds its own handle on the blocking pool.

use std::future::Future;
use std::sync::Arc;

pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: String) -> impl Future<Output = Result<(), ClipboardError>> + Send;
}

impl<T: ClipboardWriter> ClipboardWriter for Arc<T> {
    fn write_text(&self, text: String) -> impl Future<Output = Result<(), ClipboardError>> + Send {
        (**self).write_text(text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    async fn write_text(&self, text: String) -> Result<(), ClipboardError> {
        tokio::task::spawn_blocking(move || {
            let mut clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            clipboard
                .set_text(text)
                .map_err(|e| ClipboardError::Write(e.to_string()))
        })
        .await
        .map_err(|e| ClipboardError::Task(e.to_string()))?
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write clipboard: {0}")]
    Write(String),

    #[error("Clipboard task failed: {0}")]
    Task(String),
}
