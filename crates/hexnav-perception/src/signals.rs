//! Signal extractors: three independent binary hazard masks over the
//! detection band.
//!
//! | Signal     | Input                | Fires on                               |
//! |------------|----------------------|----------------------------------------|
//! | saturation | blurred HSV S plane  | `S > saturation_threshold`             |
//! | contrast   | blurred luma         | `|Laplacian| > contrast_threshold`     |
//! | edges      | blurred luma         | Canny contour, thresholds `t` and `2t` |
//!
//! Each extractor is stateless and returns a [`Mask`] with the band's
//! resolution (frame width × band height).

use std::collections::VecDeque;

use hexnav_types::{Frame, NavConfig};

use crate::raster::{LAPLACIAN, Mask, Plane, SOBEL_X, SOBEL_Y, gray_band, saturation_band};
use crate::roi::Roi;

/// Ratio between the strong and the weak Canny threshold.
pub const CANNY_RATIO: u32 = 2;

/// The three hazard masks of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSet {
    pub saturation: Mask,
    pub contrast: Mask,
    pub edges: Mask,
}

impl SignalSet {
    /// Run all three extractors over the band described by `roi`.
    ///
    /// `frame` must already be validated and match `roi`'s dimensions.
    pub fn extract(frame: &Frame, roi: &Roi, config: &NavConfig) -> Self {
        let gray = gray_band(frame, roi.y_start, roi.y_end).gaussian_blur(config.blur_kernel);
        let sat = saturation_band(frame, roi.y_start, roi.y_end).gaussian_blur(config.blur_kernel);

        Self {
            saturation: saturation_signal(&sat, config.saturation_threshold),
            contrast: contrast_signal(&gray, config.contrast_threshold),
            edges: edge_signal(&gray, config.edge_threshold),
        }
    }

    /// Pixel-wise OR of the three masks.
    pub fn union(&self) -> Mask {
        let mut out = self.saturation.clone();
        out.union_with(&self.contrast);
        out.union_with(&self.edges);
        out
    }
}

/// Flag strongly coloured pixels.
///
/// A mask that covers the whole band carries no spatial information (the
/// camera sees one uniform colour) and is returned empty.
pub fn saturation_signal(saturation: &Plane, threshold: u32) -> Mask {
    let mut mask = saturation.threshold(threshold);
    if !mask.is_empty() && mask.count() == mask.len() {
        mask.clear();
    }
    mask
}

/// Flag pixels whose Laplacian magnitude exceeds `threshold`.
pub fn contrast_signal(gray: &Plane, threshold: u32) -> Mask {
    let response = gray.convolve3(&LAPLACIAN);
    let mut mask = Mask::new(gray.width(), gray.height());
    for y in 0..gray.height() {
        for x in 0..gray.width() {
            if response[y * gray.width() + x].unsigned_abs() > threshold {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

const TAN_22_5: f32 = 0.414_213_56;

/// Two-threshold gradient edge detector.
///
/// Sobel gradients with an L1 magnitude, non-maximum suppression along the
/// quantised gradient direction, then hysteresis: pixels above
/// `CANNY_RATIO · threshold` seed contours that grow through 8-connected
/// pixels above `threshold`.
pub fn edge_signal(gray: &Plane, threshold: u32) -> Mask {
    let (w, h) = (gray.width(), gray.height());
    let mut mask = Mask::new(w, h);
    if w < 3 || h < 3 {
        return mask;
    }

    let gx = gray.convolve3(&SOBEL_X);
    let gy = gray.convolve3(&SOBEL_Y);
    let mag: Vec<u32> = gx
        .iter()
        .zip(&gy)
        .map(|(a, b)| a.unsigned_abs() + b.unsigned_abs())
        .collect();

    let low = threshold;
    let high = threshold.saturating_mul(CANNY_RATIO);

    // 0 = suppressed, 1 = weak, 2 = strong
    let mut class = vec![0u8; w * h];
    let mut strong: VecDeque<usize> = VecDeque::new();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let (ax, ay) = (gx[i].unsigned_abs() as f32, gy[i].unsigned_abs() as f32);
            let same_sign = (gx[i] >= 0) == (gy[i] >= 0);
            let (n1, n2) = if ay <= ax * TAN_22_5 {
                (mag[i - 1], mag[i + 1])
            } else if ax <= ay * TAN_22_5 {
                (mag[i - w], mag[i + w])
            } else if same_sign {
                (mag[i - w - 1], mag[i + w + 1])
            } else {
                (mag[i - w + 1], mag[i + w - 1])
            };
            // Ties along a flat ridge keep the first pixel only.
            if m < n1 || m <= n2 {
                continue;
            }
            if m > high {
                class[i] = 2;
                strong.push_back(i);
            } else {
                class[i] = 1;
            }
        }
    }

    while let Some(i) = strong.pop_front() {
        let (x, y) = (i % w, i / w);
        mask.set(x, y, true);
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if class[n] == 1 {
                    class[n] = 2;
                    strong.push_back(n);
                }
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::partition;

    fn step_plane(w: usize, h: usize, split: usize, lo: u8, hi: u8) -> Plane {
        Plane::from_fn(w, h, |x, _| if x < split { lo } else { hi })
    }

    #[test]
    fn neutral_uniform_frame_fires_nothing() {
        let cfg = NavConfig::default();
        let frame = Frame::solid(64, 48, [128, 128, 128]);
        let roi = partition(64, 48, &cfg).unwrap();
        let signals = SignalSet::extract(&frame, &roi, &cfg);
        assert_eq!(signals.union().count(), 0);
    }

    #[test]
    fn uniform_coloured_frame_suppresses_saturation() {
        let cfg = NavConfig::default();
        let frame = Frame::solid(64, 48, [0, 180, 40]);
        let roi = partition(64, 48, &cfg).unwrap();
        let signals = SignalSet::extract(&frame, &roi, &cfg);
        assert_eq!(signals.saturation.count(), 0);
        assert_eq!(signals.union().count(), 0);
    }

    #[test]
    fn coloured_patch_fires_saturation_only_inside() {
        let cfg = NavConfig::default();
        let frame = Frame::solid(80, 80, [128, 128, 128]).with_rect(30, 40, 20, 20, [220, 20, 20]);
        let roi = partition(80, 80, &cfg).unwrap();
        let signals = SignalSet::extract(&frame, &roi, &cfg);
        // Band starts at row 20, so the patch centre sits at band row 30.
        assert!(signals.saturation.get(40, 30));
        assert!(!signals.saturation.get(5, 5));
    }

    #[test]
    fn contrast_fires_on_step_but_not_on_flat() {
        let plane = step_plane(20, 10, 10, 0, 200);
        let mask = contrast_signal(&plane, 25);
        assert!(mask.get(9, 5));
        assert!(mask.get(10, 5));
        assert!(!mask.get(2, 5));
        assert!(!mask.get(17, 5));
    }

    #[test]
    fn edge_signal_traces_vertical_step_once() {
        let plane = step_plane(20, 10, 10, 0, 200);
        let mask = edge_signal(&plane, 60);
        // One-pixel-wide contour along the step, no response on flat areas.
        for y in 1..9 {
            let hits: Vec<usize> = (0..20).filter(|&x| mask.get(x, y)).collect();
            assert_eq!(hits.len(), 1, "row {y}: {hits:?}");
            assert!(hits[0] == 9 || hits[0] == 10);
        }
        assert!(!mask.get(3, 5));
    }

    #[test]
    fn weak_step_below_low_threshold_is_ignored() {
        // L1 Sobel magnitude of a 10-level step is 40, below 60.
        let plane = step_plane(20, 10, 10, 100, 110);
        assert_eq!(edge_signal(&plane, 60).count(), 0);
    }

    #[test]
    fn weak_edges_survive_only_when_connected_to_strong() {
        // Strong vertical step on the left; an isolated weak block (L1
        // magnitude between low and high) in the bottom-right corner.
        let plane = Plane::from_fn(40, 20, |x, y| {
            if x < 8 {
                250
            } else if x >= 30 && y >= 12 {
                118
            } else {
                100
            }
        });
        let mask = edge_signal(&plane, 60);
        assert!((1..19).all(|y| mask.get(8, y)));
        assert!(!(10..19).any(|y| mask.get(29, y) || mask.get(30, y)));
        assert!(!(30..40).any(|x| mask.get(x, 11) || mask.get(x, 12)));
    }

    #[test]
    fn tiny_plane_has_no_edges() {
        let plane = Plane::from_fn(2, 2, |x, _| if x == 0 { 0 } else { 255 });
        assert_eq!(edge_signal(&plane, 60).count(), 0);
    }
}
