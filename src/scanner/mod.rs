//! QR scanner domain — public API.
//!
//! This module owns the viewport, the admission policy and the recent
//! payload memory. External code should only use what is exported here.

mod admission;
mod engine;
mod geometry;
mod input;
mod payload;
mod throttle;

pub use engine::{QrScanEngine, ScanHandler, ScanOutcome};
pub use geometry::{
    clamp_center_to_viewport, compute_capture_region, CaptureRegion, Frame, Point, WindowSize,
};
pub use input::{InputEffect, InputEvent, KeyPress};

