//! Input events the engine reacts to.

use super::geometry::WindowSize;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyPress {
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.alt || self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f64, y: f64 },
    /// Negative `delta_y` is scroll-up, which grows the viewport.
    Wheel { delta_y: f64 },
    Key(KeyPress),
    /// Pointer released over the overlay.
    Confirm,
    WindowResized(WindowSize),
}

/// What the engine did with an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEffect {
    Ignored,
    Applied,
    Throttled,
    ScanRequested,
}
