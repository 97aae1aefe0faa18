//! Wire frames exchanged with the host, one JSON object per line.
//!
//! Requests carry an `id` echoed by the matching response. Events are
//! fire-and-forget in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scanner::{CaptureRegion, InputEvent, KeyPress, WindowSize};

pub const SCAN_REGION_QR: &str = "scan_region_qr";
pub const OPEN_URL: &str = "open_url";
pub const SHOW_NOTIFICATION: &str = "show_notification";
pub const HIDE_SNAP_OVERLAY: &str = "hide_snap_overlay";
pub const QR_FRAME_CHANGED: &str = "qr-frame-changed";

#[derive(Debug, Serialize)]
pub struct RequestFrame<'a, P> {
    pub id: u64,
    pub command: &'a str,
    pub params: P,
}

#[derive(Debug, Serialize)]
pub struct EventFrame<'a, P> {
    pub event: &'a str,
    pub payload: P,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseFrame {
    pub id: u64,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Anything the host may write on a line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Response(ResponseFrame),
    Event(HostEvent),
}

impl Incoming {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum HostEvent {
    OverlayShown,
    OverlayHidden,
    PointerMoved {
        x: f64,
        y: f64,
    },
    PointerUp,
    Wheel {
        #[serde(rename = "deltaY")]
        delta_y: f64,
    },
    KeyDown {
        key: String,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        meta: bool,
    },
    WindowResized {
        width: f64,
        height: f64,
    },
    Shutdown,
}

/// What a host event means for the scanner session.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignal {
    Activate(bool),
    Input(InputEvent),
    Shutdown,
}

impl From<HostEvent> for HostSignal {
    fn from(event: HostEvent) -> Self {
        match event {
            HostEvent::OverlayShown => HostSignal::Activate(true),
            HostEvent::OverlayHidden => HostSignal::Activate(false),
            HostEvent::PointerMoved { x, y } => HostSignal::Input(InputEvent::PointerMoved { x, y }),
            HostEvent::PointerUp => HostSignal::Input(InputEvent::Confirm),
            HostEvent::Wheel { delta_y } => HostSignal::Input(InputEvent::Wheel { delta_y }),
            HostEvent::KeyDown {
                key,
                alt,
                ctrl,
                meta,
            } => HostSignal::Input(InputEvent::Key(KeyPress {
                key,
                alt,
                ctrl,
                meta,
            })),
            HostEvent::WindowResized { width, height } => {
                HostSignal::Input(InputEvent::WindowResized(WindowSize::new(width, height)))
            }
            HostEvent::Shutdown => HostSignal::Shutdown,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanRegionParams {
    pub params: CaptureRegion,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRegionResult {
    #[serde(default)]
    pub payload: Option<String>,
}

impl ScanRegionResult {
    /// Empty strings count as "nothing found".
    pub fn into_payload(self) -> Option<String> {
        self.payload.filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenUrlParams<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub target: String,
}

impl NotificationPayload {
    pub fn qr_opened(url: &str) -> Self {
        Self {
            value: format!("Opened: {url}"),
            data: Some("on_url".into()),
            target: "qr_scanner".into(),
        }
    }

    pub fn qr_copied(content: &str) -> Self {
        Self {
            value: format!("Copied: {content}"),
            data: Some("on_copied".into()),
            target: "qr_scanner".into(),
        }
    }
}
