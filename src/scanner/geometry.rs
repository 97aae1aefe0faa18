//! Viewport geometry — functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes frame and window dimensions in, returns clamped positions
//! and integer capture rectangles out.

use serde::{Deserialize, Serialize};

/// A point in device-independent window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The square region the scanner is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub size: f64,
    pub center: Point,
}

impl Frame {
    pub fn new(size: f64, center: Point) -> Self {
        Self { size, center }
    }
}

/// Current inner dimensions of the overlay window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSize {
    /// Builds a window size, collapsing negative or non-finite dimensions to zero.
    pub fn new(width: f64, height: f64) -> Self {
        let sanitize = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            width: sanitize(width),
            height: sanitize(height),
        }
    }

    /// True when either side is zero, e.g. before the host reported a size.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn midpoint(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Integer pixel rectangle sent to the native decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamps a requested center so a square of `size` stays inside the window.
///
/// When the window is smaller than the square on an axis, that axis
/// collapses to the half-size instead of going negative.
pub fn clamp_center_to_viewport(x: f64, y: f64, size: f64, window: WindowSize) -> Point {
    let half = size / 2.0;
    let max_x = half.max(window.width - half);
    let max_y = half.max(window.height - half);

    Point::new(clamp_axis(x, half, max_x), clamp_axis(y, half, max_y))
}

/// Computes the padded capture rectangle for `frame`.
///
/// The frame size is rounded first; the padded square is shifted (not
/// shrunk) to fit inside the window, and its origin never goes below zero.
pub fn compute_capture_region(frame: &Frame, padding: u32, window: WindowSize) -> CaptureRegion {
    let size = frame.size.round().max(0.0);
    let padding = f64::from(padding);
    let half_padded = size / 2.0 + padding;
    let padded_size = size + padding * 2.0;

    let max_left = (window.width - padded_size).max(0.0);
    let max_top = (window.height - padded_size).max(0.0);

    let left = clamp_axis(frame.center.x - half_padded, 0.0, max_left);
    let top = clamp_axis(frame.center.y - half_padded, 0.0, max_top);

    CaptureRegion {
        x: left.round().max(0.0) as u32,
        y: top.round().max(0.0) as u32,
        width: padded_size as u32,
        height: padded_size as u32,
    }
}

/// `f64::clamp` without the panic on NaN input; NaN lands on `min`.
fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}
