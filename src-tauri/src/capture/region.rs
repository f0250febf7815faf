//! Pixel-space cropping and window compositing for the fallback paths.

use super::{CaptureError, CaptureRegion, DisplayShot, WindowShot};
use image::{imageops, RgbaImage};

/// Crop a full-display shot to `region`, converting points to pixels.
///
/// The crop is clamped to the display; a region entirely off the display
/// is an error.
pub fn crop_display(shot: &DisplayShot, region: &CaptureRegion) -> Result<RgbaImage, CaptureError> {
    let scale = shot.scale;
    let (img_w, img_h) = (shot.image.width() as f64, shot.image.height() as f64);

    let left = ((region.x() - shot.origin_x) * scale).round().max(0.0);
    let top = ((region.y() - shot.origin_y) * scale).round().max(0.0);
    let right = ((region.right() - shot.origin_x) * scale).round().min(img_w);
    let bottom = ((region.bottom() - shot.origin_y) * scale).round().min(img_h);

    if right <= left || bottom <= top {
        return Err(CaptureError::OutOfBounds);
    }

    let cropped = imageops::crop_imm(
        &shot.image,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
    .to_image();
    Ok(cropped)
}

/// Paint window snapshots back-to-front onto a canvas covering `region`.
///
/// The pixel density is taken from the frontmost window; windows that do
/// not intersect the region are ignored.
pub fn composite_windows(
    shots: &[WindowShot],
    region: &CaptureRegion,
) -> Result<RgbaImage, CaptureError> {
    let mut visible: Vec<&WindowShot> = shots
        .iter()
        .filter(|s| s.frame.intersects(region) && s.image.width() > 0)
        .collect();
    if visible.is_empty() {
        return Err(CaptureError::NoWindows);
    }
    visible.sort_by_key(|s| s.z);

    let front = visible[visible.len() - 1];
    let scale = front.image.width() as f64 / front.frame.width();

    let canvas_w = (region.width() * scale).round().max(1.0) as u32;
    let canvas_h = (region.height() * scale).round().max(1.0) as u32;
    let mut canvas = RgbaImage::new(canvas_w, canvas_h);

    for shot in visible {
        let dx = ((shot.frame.x() - region.x()) * scale).round() as i64;
        let dy = ((shot.frame.y() - region.y()) * scale).round() as i64;
        imageops::overlay(&mut canvas, &shot.image, dx, dy);
    }
    Ok(canvas)
}
