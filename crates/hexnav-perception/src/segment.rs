//! Fusion & segmentation: merges the signal masks into one hazard map and
//! extracts obstacle candidates with their geometry.

use hexnav_types::{NavConfig, Zone};
use serde::Serialize;

use crate::raster::Mask;
use crate::roi::Roi;
use crate::signals::SignalSet;

/// Axis-aligned bounding box in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    /// First row below the box (exclusive bottom edge).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Horizontal centre column.
    pub fn center_x(&self) -> u32 {
        self.x + self.w / 2
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f32 {
        self.w as f32 / self.h.max(1) as f32
    }
}

/// Coarse size bucket derived from pixel area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// `small < size_small_max_area ≤ medium < size_medium_max_area ≤ large`.
    pub fn from_area(area: u32, config: &NavConfig) -> Self {
        if area < config.size_small_max_area {
            SizeClass::Small
        } else if area < config.size_medium_max_area {
            SizeClass::Medium
        } else {
            SizeClass::Large
        }
    }
}

/// One segmented obstacle of the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObstacleCandidate {
    pub bbox: BoundingBox,
    /// Number of pixels in the component.
    pub area: u32,
    pub zone: Zone,
    pub size: SizeClass,
    /// Bottom edge over frame height, in `[0, 1]`.
    pub proximity: f32,
}

/// OR the masks and clean the result: close, open, dilate, then fill
/// enclosed holes so outlined objects become solid blobs.
pub fn fuse(signals: &SignalSet, config: &NavConfig) -> Mask {
    let mut mask = signals.union().close(config.close_kernel).open(config.open_kernel);
    for _ in 0..config.dilate_iterations {
        mask = mask.dilate(3);
    }
    mask.fill_holes()
}

/// Label 8-connected components of `mask` and turn the survivors into
/// candidates, nearest first.
///
/// `mask` covers the band rows of `roi`; returned boxes are in frame
/// coordinates.
pub fn segment(mask: &Mask, roi: &Roi, config: &NavConfig) -> Vec<ObstacleCandidate> {
    let mut candidates: Vec<ObstacleCandidate> = label_components(mask)
        .into_iter()
        .filter_map(|c| {
            let bbox = BoundingBox {
                x: c.min_x as u32,
                y: roi.y_start + c.min_y as u32,
                w: (c.max_x - c.min_x + 1) as u32,
                h: (c.max_y - c.min_y + 1) as u32,
            };
            let area = c.pixels as u32;
            if area < config.min_obstacle_area
                || bbox.h < config.min_obstacle_height
                || bbox.aspect_ratio() > config.max_aspect_ratio
            {
                return None;
            }
            let proximity = (bbox.bottom() as f32 / roi.frame_height as f32).clamp(0.0, 1.0);
            Some(ObstacleCandidate {
                bbox,
                area,
                zone: roi.zone_at(bbox.center_x()),
                size: SizeClass::from_area(area, config),
                proximity,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.proximity.total_cmp(&a.proximity));
    candidates
}

struct Component {
    pixels: usize,
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

/// Row-major scan with an explicit stack, so labelling order (and thus the
/// candidate order for equal proximity) is deterministic.
fn label_components(mask: &Mask) -> Vec<Component> {
    let (w, h) = (mask.width(), mask.height());
    let mut seen = vec![false; w * h];
    let mut stack = Vec::new();
    let mut out = Vec::new();

    for sy in 0..h {
        for sx in 0..w {
            let start = sy * w + sx;
            if seen[start] || !mask.get(sx, sy) {
                continue;
            }
            seen[start] = true;
            stack.push(start);
            let mut c = Component {
                pixels: 0,
                min_x: sx,
                max_x: sx,
                min_y: sy,
                max_y: sy,
            };
            while let Some(i) = stack.pop() {
                let (x, y) = (i % w, i / w);
                c.pixels += 1;
                c.min_x = c.min_x.min(x);
                c.max_x = c.max_x.max(x);
                c.min_y = c.min_y.min(y);
                c.max_y = c.max_y.max(y);
                for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        let n = ny * w + nx;
                        if !seen[n] && mask.get(nx, ny) {
                            seen[n] = true;
                            stack.push(n);
                        }
                    }
                }
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::partition;

    fn paint(mask: &mut Mask, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set(x, y, true);
            }
        }
    }

    fn vga() -> (Roi, NavConfig) {
        let cfg = NavConfig::default();
        (partition(640, 480, &cfg).unwrap(), cfg)
    }

    #[test]
    fn empty_mask_yields_no_candidates() {
        let (roi, cfg) = vga();
        let mask = Mask::new(640, roi.height() as usize);
        assert!(segment(&mask, &roi, &cfg).is_empty());
    }

    #[test]
    fn candidate_geometry_in_frame_coordinates() {
        let (roi, cfg) = vga();
        let mut mask = Mask::new(640, roi.height() as usize);
        // Band rows 200..300 → frame rows 320..420.
        paint(&mut mask, 270, 200, 100, 100);
        let found = segment(&mask, &roi, &cfg);
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.bbox, BoundingBox { x: 270, y: 320, w: 100, h: 100 });
        assert_eq!(c.area, 10_000);
        assert_eq!(c.zone, Zone::Center);
        assert_eq!(c.size, SizeClass::Medium);
        assert!((c.proximity - 420.0 / 480.0).abs() < 1e-6);
    }

    #[test]
    fn small_short_and_flat_components_are_rejected() {
        let (roi, cfg) = vga();
        let mut mask = Mask::new(640, roi.height() as usize);
        paint(&mut mask, 10, 10, 50, 50); // area 2500 < 4000
        paint(&mut mask, 100, 100, 200, 30); // height 30 < 35
        paint(&mut mask, 20, 250, 600, 40); // aspect 15 > 8
        assert!(segment(&mask, &roi, &cfg).is_empty());
    }

    #[test]
    fn zone_follows_box_centre() {
        let (roi, cfg) = vga();
        let mut mask = Mask::new(640, roi.height() as usize);
        paint(&mut mask, 150, 20, 100, 60); // centre x 200 → left
        paint(&mut mask, 500, 20, 100, 60); // centre x 550 → right
        let zones: Vec<Zone> = segment(&mask, &roi, &cfg).iter().map(|c| c.zone).collect();
        assert!(zones.contains(&Zone::Left));
        assert!(zones.contains(&Zone::Right));
    }

    #[test]
    fn diagonal_pixels_join_one_component() {
        let mut mask = Mask::new(4, 4);
        mask.set(0, 0, true);
        mask.set(1, 1, true);
        mask.set(3, 3, true);
        let comps = label_components(&mask);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].pixels, 2);
    }

    #[test]
    fn candidates_sorted_nearest_first() {
        let (roi, cfg) = vga();
        let mut mask = Mask::new(640, roi.height() as usize);
        paint(&mut mask, 10, 10, 80, 80);
        paint(&mut mask, 400, 200, 80, 80);
        let found = segment(&mask, &roi, &cfg);
        assert_eq!(found.len(), 2);
        assert!(found[0].proximity > found[1].proximity);
    }

    #[test]
    fn size_classes_follow_thresholds() {
        let cfg = NavConfig::default();
        assert_eq!(SizeClass::from_area(4999, &cfg), SizeClass::Small);
        assert_eq!(SizeClass::from_area(5000, &cfg), SizeClass::Medium);
        assert_eq!(SizeClass::from_area(15_000, &cfg), SizeClass::Large);
    }

    #[test]
    fn fuse_fills_outlined_box() {
        let cfg = NavConfig::default();
        // A 4-pixel-thick ring survives the opening pass.
        let mut edges = Mask::new(100, 100);
        paint(&mut edges, 20, 20, 60, 4);
        paint(&mut edges, 20, 76, 60, 4);
        paint(&mut edges, 20, 20, 4, 60);
        paint(&mut edges, 76, 20, 4, 60);
        let signals = SignalSet {
            saturation: Mask::new(100, 100),
            contrast: Mask::new(100, 100),
            edges,
        };
        let fused = fuse(&signals, &cfg);
        assert!(fused.get(50, 50));
        assert!(!fused.get(5, 5));
    }

    #[test]
    fn fuse_drops_isolated_specks() {
        let cfg = NavConfig::default();
        let mut contrast = Mask::new(60, 60);
        contrast.set(30, 30, true);
        let signals = SignalSet {
            saturation: Mask::new(60, 60),
            contrast,
            edges: Mask::new(60, 60),
        };
        assert_eq!(fuse(&signals, &cfg).count(), 0);
    }
}
