//! Screen capture domain: public API.
//!
//! This module owns all screen capture functionality.
//! External code should only use the public items exported here.
//!
//! `capture()` tries three strategies in order and returns the first
//! image it gets:
//!   1. direct region snapshot (point-space, correct on Retina)
//!   2. full primary display, cropped in pixel space
//!   3. composite of the on-screen windows intersecting the region

mod region;

#[cfg(target_os = "macos")]
mod xcap_backend;

pub use region::{composite_windows, crop_display};
#[cfg(target_os = "macos")]
pub use xcap_backend::XcapBackend;

use image::RgbaImage;
use serde::Serialize;

/// A rectangle in global screen points, top-left origin.
///
/// Width and height are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaptureRegion {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl CaptureRegion {
    /// `None` unless width and height are finite and > 0.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        let finite = [x, y, width, height].iter().all(|v| v.is_finite());
        if !finite || width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &CaptureRegion) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A still snapshot of one region. Never mutated after capture.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    region: CaptureRegion,
    image: RgbaImage,
}

impl CapturedImage {
    pub fn new(region: CaptureRegion, image: RgbaImage) -> Self {
        Self { region, image }
    }

    pub fn region(&self) -> &CaptureRegion {
        &self.region
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Encode to PNG in memory, no temp files.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, CaptureError> {
        let mut png_bytes = Vec::new();
        self.image
            .write_to(
                &mut std::io::Cursor::new(&mut png_bytes),
                image::ImageFormat::Png,
            )
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(png_bytes)
    }
}

/// A full-display snapshot and where it sits on the desktop.
#[derive(Debug, Clone)]
pub struct DisplayShot {
    pub image: RgbaImage,
    /// Display origin in global points.
    pub origin_x: f64,
    pub origin_y: f64,
    /// Pixels per point (2.0 on Retina).
    pub scale: f64,
}

/// One window's snapshot for the composite fallback.
#[derive(Debug, Clone)]
pub struct WindowShot {
    pub frame: CaptureRegion,
    pub image: RgbaImage,
    /// Stacking order; higher is closer to the viewer.
    pub z: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture backend error: {0}")]
    Backend(String),
    #[error("region lies outside the captured display")]
    OutOfBounds,
    #[error("no on-screen windows intersect the region")]
    NoWindows,
    #[error("image encode failed: {0}")]
    Encode(String),
}

/// Platform capture primitives, one per strategy.
pub trait CaptureBackend: Send + Sync {
    fn capture_region(&self, region: &CaptureRegion) -> Result<RgbaImage, CaptureError>;
    fn capture_display(&self) -> Result<DisplayShot, CaptureError>;
    fn capture_windows(&self, region: &CaptureRegion) -> Result<Vec<WindowShot>, CaptureError>;
}

/// Capture `region`, falling back through the strategies.
///
/// Returns `None` once every strategy has failed. There is no retry:
/// failures here are nearly always a missing screen-recording grant.
pub fn capture(backend: &dyn CaptureBackend, region: &CaptureRegion) -> Option<CapturedImage> {
    let start = std::time::Instant::now();

    match backend.capture_region(region) {
        Ok(image) => {
            log::info!(
                "[CAPTURE] Region {}x{} captured directly in {}ms",
                image.width(),
                image.height(),
                start.elapsed().as_millis()
            );
            return Some(CapturedImage::new(*region, image));
        }
        Err(e) => log::warn!("[CAPTURE] Direct region capture failed: {}", e),
    }

    match backend
        .capture_display()
        .and_then(|shot| crop_display(&shot, region))
    {
        Ok(image) => {
            log::info!(
                "[CAPTURE] Region cropped from full display in {}ms",
                start.elapsed().as_millis()
            );
            return Some(CapturedImage::new(*region, image));
        }
        Err(e) => log::warn!("[CAPTURE] Display capture + crop failed: {}", e),
    }

    match backend
        .capture_windows(region)
        .and_then(|shots| composite_windows(&shots, region))
    {
        Ok(image) => {
            log::info!(
                "[CAPTURE] Region composited from windows in {}ms",
                start.elapsed().as_millis()
            );
            Some(CapturedImage::new(*region, image))
        }
        Err(e) => {
            log::error!("[CAPTURE] All capture strategies failed, last: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_rejects_degenerate_sizes() {
        assert!(CaptureRegion::new(0.0, 0.0, 0.0, 10.0).is_none());
        assert!(CaptureRegion::new(0.0, 0.0, 10.0, -1.0).is_none());
        assert!(CaptureRegion::new(f64::NAN, 0.0, 10.0, 10.0).is_none());
        assert!(CaptureRegion::new(-20.0, 5.0, 10.0, 10.0).is_some());
    }

    #[test]
    fn intersection_excludes_touching_edges() {
        let a = CaptureRegion::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = CaptureRegion::new(10.0, 0.0, 10.0, 10.0).unwrap();
        let c = CaptureRegion::new(5.0, 5.0, 10.0, 10.0).unwrap();
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&b));
    }

    #[test]
    fn png_encoding_produces_signature() {
        let region = CaptureRegion::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let captured = CapturedImage::new(region, RgbaImage::new(2, 2));
        let png = captured.to_png_bytes().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
