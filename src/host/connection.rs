//! Request/response correlation and event fan-out over a line channel.
//!
//! Works over any async reader/writer pair, so the same code serves a
//! spawned host process and in-memory pipes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::protocol::{
    EventFrame, Incoming, NotificationPayload, OpenUrlParams, RequestFrame, ScanRegionParams,
    ScanRegionResult, HIDE_SNAP_OVERLAY, OPEN_URL, SCAN_REGION_QR, SHOW_NOTIFICATION,
};
use super::{HostError, HostEvent, OverlayHost, RegionDecoder};
use crate::scanner::CaptureRegion;

type Reply = Result<Value, String>;
type PendingMap = Arc<Mutex<Pending>>;

/// Waiters keyed by request id. Once `closed` is set no new waiter is
/// registered.
#[derive(Default)]
struct Pending {
    waiters: HashMap<u64, oneshot::Sender<Reply>>,
    closed: bool,
}

const EVENT_BUFFER: usize = 256;

pub struct HostConnection {
    writer: tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader_task: JoinHandle<()>,
}

impl HostConnection {
    /// Wraps a reader/writer pair and starts the reader task.
    ///
    /// Returns the connection and the stream of host events. The event
    /// stream ends when the host closes its side.
    pub fn new<R, W>(reader: R, writer: W) -> (Self, mpsc::Receiver<HostEvent>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(Pending::default()));
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let reader_task = tokio::spawn(read_loop(reader, Arc::clone(&pending), events_tx));

        let connection = Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
        };
        (connection, events_rx)
    }

    /// Sends a request and waits for the host's answer.
    pub async fn invoke<P, R>(&self, command: &str, params: P) -> Result<R, HostError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&RequestFrame {
            id,
            command,
            params,
        })
        .map_err(HostError::Encode)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.closed {
                return Err(HostError::Closed);
            }
            pending.waiters.insert(id, reply_tx);
        }

        if let Err(e) = self.write_line(&line).await {
            lock(&self.pending).waiters.remove(&id);
            return Err(e);
        }
        log::debug!("[HOST] -> #{} {}", id, command);

        let value = reply_rx
            .await
            .map_err(|_| HostError::Closed)?
            .map_err(HostError::Remote)?;
        serde_json::from_value(value).map_err(HostError::Decode)
    }

    /// Publishes an event to the host without waiting for anything.
    pub async fn emit<P: Serialize>(&self, event: &str, payload: P) -> Result<(), HostError> {
        let line =
            serde_json::to_string(&EventFrame { event, payload }).map_err(HostError::Encode)?;
        self.write_line(&line).await
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        lock(&self.pending).waiters.len()
    }

    async fn write_line(&self, line: &str) -> Result<(), HostError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for HostConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

impl RegionDecoder for HostConnection {
    async fn decode_region(&self, region: CaptureRegion) -> Result<Option<String>, HostError> {
        let result: ScanRegionResult = self
            .invoke(SCAN_REGION_QR, ScanRegionParams { params: region })
            .await?;
        Ok(result.into_payload())
    }
}

impl OverlayHost for HostConnection {
    async fn open_url(&self, url: &str) -> Result<(), HostError> {
        let _: Value = self.invoke(OPEN_URL, OpenUrlParams { url }).await?;
        Ok(())
    }

    async fn notify(&self, notification: NotificationPayload) -> Result<(), HostError> {
        let _: Value = self
            .invoke(SHOW_NOTIFICATION, serde_json::json!({ "payload": notification }))
            .await?;
        Ok(())
    }

    async fn close_overlay(&self) -> Result<(), HostError> {
        let _: Value = self.invoke(HIDE_SNAP_OVERLAY, serde_json::json!({})).await?;
        Ok(())
    }
}

async fn read_loop<R>(reader: R, pending: PendingMap, events: mpsc::Sender<HostEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("[HOST] Read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match Incoming::parse(&line) {
            Ok(Incoming::Response(frame)) => {
                let Some(reply_tx) = lock(&pending).waiters.remove(&frame.id) else {
                    log::warn!("[HOST] Response for unknown request #{}", frame.id);
                    continue;
                };
                let reply = match frame.error {
                    Some(message) => Err(message),
                    None => Ok(frame.result),
                };
                // The requester may have given up; nothing to do then.
                let _ = reply_tx.send(reply);
            }
            Ok(Incoming::Event(event)) => {
                if events.send(event).await.is_err() {
                    log::debug!("[HOST] Event receiver dropped");
                }
            }
            Err(e) => {
                log::warn!("[HOST] Skipping malformed line ({}): {}", e, line);
            }
        }
    }

    // Dropping the senders fails every waiter with `Closed`.
    {
        let mut pending = lock(&pending);
        pending.closed = true;
        pending.waiters.clear();
    }
    log::info!("[HOST] Connection closed");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
