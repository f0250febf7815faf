//! Capture primitives backed by xcap (ScreenCaptureKit / CGWindowList).

use super::{CaptureBackend, CaptureError, CaptureRegion, DisplayShot, WindowShot};
use image::RgbaImage;
use xcap::{Monitor, Window};

fn backend_err(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::Backend(e.to_string())
}

#[derive(Default)]
pub struct XcapBackend;

impl XcapBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for XcapBackend {
    fn capture_region(&self, region: &CaptureRegion) -> Result<RgbaImage, CaptureError> {
        let monitor =
            Monitor::from_point(region.x() as i32, region.y() as i32).map_err(backend_err)?;
        let mon_x = monitor.x().map_err(backend_err)? as f64;
        let mon_y = monitor.y().map_err(backend_err)? as f64;
        let mon_w = monitor.width().map_err(backend_err)? as f64;
        let mon_h = monitor.height().map_err(backend_err)? as f64;

        // Regions spanning two displays go to the fallback paths.
        if region.right() > mon_x + mon_w || region.bottom() > mon_y + mon_h {
            return Err(CaptureError::OutOfBounds);
        }

        monitor
            .capture_region(
                (region.x() - mon_x).round() as u32,
                (region.y() - mon_y).round() as u32,
                region.width().round() as u32,
                region.height().round() as u32,
            )
            .map_err(backend_err)
    }

    fn capture_display(&self) -> Result<DisplayShot, CaptureError> {
        let monitors = Monitor::all().map_err(backend_err)?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or(monitors.first())
            .ok_or_else(|| CaptureError::Backend("no monitor found".into()))?;

        let image = monitor.capture_image().map_err(backend_err)?;
        let width_pts = monitor.width().map_err(backend_err)? as f64;
        let scale = if width_pts > 0.0 {
            image.width() as f64 / width_pts
        } else {
            1.0
        };

        Ok(DisplayShot {
            origin_x: monitor.x().map_err(backend_err)? as f64,
            origin_y: monitor.y().map_err(backend_err)? as f64,
            scale,
            image,
        })
    }

    fn capture_windows(&self, region: &CaptureRegion) -> Result<Vec<WindowShot>, CaptureError> {
        let windows = Window::all().map_err(backend_err)?;
        let mut shots = Vec::new();

        for window in windows {
            if window.is_minimized().unwrap_or(true) {
                continue;
            }
            let frame = match (window.x(), window.y(), window.width(), window.height()) {
                (Ok(x), Ok(y), Ok(w), Ok(h)) => {
                    CaptureRegion::new(x as f64, y as f64, w as f64, h as f64)
                }
                _ => None,
            };
            let Some(frame) = frame.filter(|f| f.intersects(region)) else {
                continue;
            };
            match window.capture_image() {
                Ok(image) => shots.push(WindowShot {
                    frame,
                    image,
                    z: window.z().unwrap_or(0),
                }),
                Err(e) => log::debug!("[CAPTURE] Skipping window: {}", e),
            }
        }

        if shots.is_empty() {
            return Err(CaptureError::NoWindows);
        }
        Ok(shots)
    }
}
