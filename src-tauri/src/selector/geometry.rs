//! Overlay-local → screen coordinate conversion for selections.

use crate::capture::CaptureRegion;
use serde::Deserialize;

/// Drags at or below this size (points, either axis) count as a cancel.
pub const MIN_SELECTION_SIZE: f64 = 5.0;

/// Pointer position in overlay-local points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Normalized drag rectangle in overlay-local points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LocalRect {
    /// Rectangle spanned by two drag corners, in any direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn exceeds_minimum(&self) -> bool {
        self.width > MIN_SELECTION_SIZE && self.height > MIN_SELECTION_SIZE
    }
}

/// The overlay's frame in global points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Vertical orientation of the capture coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalAxis {
    /// y grows downward, same as the overlay.
    TopDown,
    /// y grows upward from the bottom of a desktop this tall.
    BottomUp { desktop_height: f64 },
}

/// Convert a local selection to an absolute capture region.
pub fn to_capture_region(
    rect: &LocalRect,
    frame: &OverlayFrame,
    axis: VerticalAxis,
) -> Option<CaptureRegion> {
    let x = frame.x + rect.x;
    let top = frame.y + rect.y;
    let y = match axis {
        VerticalAxis::TopDown => top,
        VerticalAxis::BottomUp { desktop_height } => desktop_height - (top + rect.height),
    };
    CaptureRegion::new(x, y, rect.width, rect.height)
}
