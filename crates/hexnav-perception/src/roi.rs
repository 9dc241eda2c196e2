//! ROI partitioner: carves the detection band out of a frame and splits it
//! into the LEFT / CENTER / RIGHT zones.
//!
//! Purely geometric and deterministic for given frame dimensions and
//! configuration.

use hexnav_types::{NavConfig, NavError, Zone};
use serde::Serialize;

/// Horizontal extent `[x_start, x_end)` of one zone, in frame columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneSpan {
    pub zone: Zone,
    pub x_start: u32,
    pub x_end: u32,
}

impl ZoneSpan {
    pub fn contains(&self, x: u32) -> bool {
        (self.x_start..self.x_end).contains(&x)
    }

    pub fn width(&self) -> u32 {
        self.x_end - self.x_start
    }
}

/// The active detection band of one frame geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roi {
    pub frame_width: u32,
    pub frame_height: u32,
    /// First band row (inclusive).
    pub y_start: u32,
    /// Last band row (exclusive).
    pub y_end: u32,
    /// Zones left to right; together they tile `0..frame_width`.
    pub spans: [ZoneSpan; 3],
}

impl Roi {
    /// Band height in rows.
    pub fn height(&self) -> u32 {
        self.y_end - self.y_start
    }

    /// The span of `zone`.
    pub fn span(&self, zone: Zone) -> &ZoneSpan {
        &self.spans[zone.index()]
    }

    /// The zone whose horizontal span contains column `x`.
    ///
    /// Columns past the right edge fall into [`Zone::Right`].
    pub fn zone_at(&self, x: u32) -> Zone {
        self.spans
            .iter()
            .find(|s| s.contains(x))
            .map(|s| s.zone)
            .unwrap_or(Zone::Right)
    }
}

/// Compute the detection band and zone spans for a `width × height` frame.
///
/// The band keeps rows from `roi_top_fraction · height` up to
/// `height − roi_bottom_fraction · height`; both margins are rounded to the
/// nearest row.  Zone widths follow `zone_weights`.
///
/// # Errors
///
/// Returns [`NavError::MalformedFrame`] when the dimensions are not positive
/// or too small to hold a non-empty band with three non-empty zones.
pub fn partition(width: u32, height: u32, config: &NavConfig) -> Result<Roi, NavError> {
    if width == 0 || height == 0 {
        return Err(NavError::MalformedFrame(format!(
            "non-positive dimensions {width}x{height}"
        )));
    }
    if width < 3 {
        return Err(NavError::MalformedFrame(format!(
            "frame width {width} cannot hold three zones"
        )));
    }

    let top = (height as f64 * config.roi_top_fraction as f64).round() as u32;
    let bottom_margin = (height as f64 * config.roi_bottom_fraction as f64).round() as u32;
    let y_start = top.min(height);
    let y_end = height.saturating_sub(bottom_margin);
    if y_end <= y_start {
        return Err(NavError::MalformedFrame(format!(
            "frame height {height} leaves an empty detection band"
        )));
    }

    let total: f64 = config.zone_weights.iter().map(|w| *w as f64).sum();
    let mut cumulative = 0.0;
    let mut bounds = [0u32; 4];
    for (i, weight) in config.zone_weights.iter().enumerate() {
        cumulative += *weight as f64;
        bounds[i + 1] = (width as f64 * cumulative / total).round() as u32;
    }
    bounds[3] = width;
    // Every zone keeps at least one column.
    bounds[1] = bounds[1].clamp(1, width - 2);
    bounds[2] = bounds[2].clamp(bounds[1] + 1, width - 1);

    let spans = [
        ZoneSpan {
            zone: Zone::Left,
            x_start: bounds[0],
            x_end: bounds[1],
        },
        ZoneSpan {
            zone: Zone::Center,
            x_start: bounds[1],
            x_end: bounds[2],
        },
        ZoneSpan {
            zone: Zone::Right,
            x_start: bounds[2],
            x_end: bounds[3],
        },
    ];

    Ok(Roi {
        frame_width: width,
        frame_height: height,
        y_start,
        y_end,
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_band_on_vga() {
        let roi = partition(640, 480, &NavConfig::default()).unwrap();
        assert_eq!(roi.y_start, 120);
        assert_eq!(roi.y_end, 456);
        assert_eq!(roi.height(), 336);
    }

    #[test]
    fn equal_weights_split_into_thirds() {
        let roi = partition(640, 480, &NavConfig::default()).unwrap();
        assert_eq!(roi.span(Zone::Left).x_end, 213);
        assert_eq!(roi.span(Zone::Center).x_start, 213);
        assert_eq!(roi.span(Zone::Center).x_end, 427);
        assert_eq!(roi.span(Zone::Right).x_end, 640);
        assert_eq!(roi.zone_at(0), Zone::Left);
        assert_eq!(roi.zone_at(320), Zone::Center);
        assert_eq!(roi.zone_at(639), Zone::Right);
    }

    #[test]
    fn spans_tile_the_width() {
        let roi = partition(641, 100, &NavConfig::default()).unwrap();
        let widths: u32 = roi.spans.iter().map(|s| s.width()).sum();
        assert_eq!(widths, 641);
        assert_eq!(roi.spans[0].x_end, roi.spans[1].x_start);
        assert_eq!(roi.spans[1].x_end, roi.spans[2].x_start);
    }

    #[test]
    fn weighted_zones_widen_center() {
        let cfg = NavConfig {
            zone_weights: [1.0, 2.0, 1.0],
            ..NavConfig::default()
        };
        let roi = partition(400, 100, &cfg).unwrap();
        assert_eq!(roi.span(Zone::Left).width(), 100);
        assert_eq!(roi.span(Zone::Center).width(), 200);
        assert_eq!(roi.span(Zone::Right).width(), 100);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let cfg = NavConfig::default();
        assert!(matches!(partition(0, 480, &cfg), Err(NavError::MalformedFrame(_))));
        assert!(matches!(partition(640, 0, &cfg), Err(NavError::MalformedFrame(_))));
    }

    #[test]
    fn tiny_frame_rejected() {
        let cfg = NavConfig::default();
        assert!(partition(2, 480, &cfg).is_err());
        // 1 row: top margin rounds to 0, bottom margin to 0 → band of one row.
        assert!(partition(640, 1, &cfg).is_ok());
    }

    #[test]
    fn partition_is_deterministic() {
        let cfg = NavConfig::default();
        assert_eq!(partition(320, 240, &cfg).unwrap(), partition(320, 240, &cfg).unwrap());
    }
}
