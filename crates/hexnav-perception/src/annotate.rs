//! Diagnostic overlay: an annotated copy of the frame for human inspection.
//!
//! Never required for correctness; the control loop only renders it when a
//! diagnostic sink is attached.

use std::path::Path;

use hexnav_types::{DangerLevel, Frame, NavError};
use image::{ImageBuffer, Rgb, RgbImage};

use crate::detector::Detection;

const ROI_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const ZONE_GUIDE_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const BADGE_SIZE: (u32, u32) = (48, 16);

/// Overlay colour of a danger level.
pub fn level_color(level: DangerLevel) -> Rgb<u8> {
    match level {
        DangerLevel::Ok => Rgb([0, 200, 0]),
        DangerLevel::Obs => Rgb([255, 220, 0]),
        DangerLevel::Warn => Rgb([255, 140, 0]),
        DangerLevel::Stop => Rgb([230, 0, 0]),
    }
}

/// Draw the detection band, zone guides, candidate boxes and the level
/// badge onto a copy of `frame`.
///
/// # Errors
///
/// [`NavError::MalformedFrame`] when the frame buffer does not match its
/// dimensions, or when `detection` was computed for a frame of another size.
pub fn annotate(frame: &Frame, detection: &Detection) -> Result<RgbImage, NavError> {
    frame.validate()?;
    let roi = &detection.roi;
    if (roi.frame_width, roi.frame_height) != (frame.width(), frame.height()) {
        return Err(NavError::MalformedFrame(format!(
            "detection is for {}x{} but frame is {}x{}",
            roi.frame_width,
            roi.frame_height,
            frame.width(),
            frame.height()
        )));
    }
    let mut img: RgbImage = ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| NavError::MalformedFrame("buffer does not fit image dimensions".to_string()))?;

    draw_rect(&mut img, 0, roi.y_start, roi.frame_width, roi.height(), ROI_COLOR);
    for span in &roi.spans[1..] {
        for y in roi.y_start..roi.y_end {
            img.put_pixel(span.x_start, y, ZONE_GUIDE_COLOR);
        }
    }

    let color = level_color(detection.assessment.level);
    for c in &detection.candidates {
        draw_rect(&mut img, c.bbox.x, c.bbox.y, c.bbox.w, c.bbox.h, color);
    }

    let (bw, bh) = BADGE_SIZE;
    fill_rect(&mut img, 0, 0, bw, bh, color);
    Ok(img)
}

/// Write an annotated image as PNG.
pub fn save_png(img: &RgbImage, path: &Path) -> Result<(), NavError> {
    img.save(path)
        .map_err(|e| NavError::Diagnostic(format!("failed to save {}: {e}", path.display())))
}

fn draw_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    let x1 = (x + w - 1).min(img.width() - 1);
    let y1 = (y + h - 1).min(img.height() - 1);
    if x > x1 || y > y1 {
        return;
    }
    for px in x..=x1 {
        img.put_pixel(px, y, color);
        img.put_pixel(px, y1, color);
    }
    for py in y..=y1 {
        img.put_pixel(x, py, color);
        img.put_pixel(x1, py, color);
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ObstacleDetector;
    use hexnav_types::NavConfig;
    use std::sync::Arc;

    #[test]
    fn badge_and_boxes_use_level_colour() {
        let frame = Frame::solid(640, 480, [128, 128, 128]).with_rect(270, 340, 100, 100, [230, 20, 20]);
        let detector = ObstacleDetector::new(Arc::new(NavConfig::default()));
        let detection = detector.detect(&frame).unwrap();
        assert_eq!(detection.assessment.level, DangerLevel::Stop);

        let img = annotate(&frame, &detection).unwrap();
        assert_eq!(img.dimensions(), (640, 480));
        assert_eq!(*img.get_pixel(2, 2), level_color(DangerLevel::Stop));
        let c = &detection.candidates[0];
        assert_eq!(*img.get_pixel(c.bbox.x, c.bbox.y), level_color(DangerLevel::Stop));
        // Zone guide at the left edge of the center span.
        let guide_x = detection.roi.spans[1].x_start;
        assert_eq!(*img.get_pixel(guide_x, 200), ZONE_GUIDE_COLOR);
    }

    #[test]
    fn clear_frame_gets_green_badge() {
        let frame = Frame::solid(64, 48, [90, 90, 90]);
        let detector = ObstacleDetector::new(Arc::new(NavConfig::default()));
        let detection = detector.detect(&frame).unwrap();
        let img = annotate(&frame, &detection).unwrap();
        assert_eq!(*img.get_pixel(0, 0), level_color(DangerLevel::Ok));
        // Outside the band and the badge the pixels are untouched.
        assert_eq!(*img.get_pixel(63, 2), Rgb([90, 90, 90]));
    }

    #[test]
    fn detection_from_another_frame_size_is_rejected() {
        let detector = ObstacleDetector::new(Arc::new(NavConfig::default()));
        let detection = detector.detect(&Frame::solid(640, 480, [90, 90, 90])).unwrap();
        let small = Frame::solid(64, 48, [90, 90, 90]);
        assert!(matches!(annotate(&small, &detection), Err(NavError::MalformedFrame(_))));
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        save_png(&img, &path).unwrap();
        assert!(path.exists());
    }
}
