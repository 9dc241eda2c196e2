//! [`NavConfig`] – the immutable tuning record of a navigation run.
//!
//! Loaded once at startup, checked with [`NavConfig::validate`], then shared
//! (typically behind an `Arc`) with every component that needs it.  No
//! component reads thresholds from anywhere else.

use serde::{Deserialize, Serialize};

use crate::NavError;

/// Detection, classification and policy tuning.
///
/// Every field carries a serde default so a partial TOML table is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavConfig {
    /// Minimum component area in px².
    #[serde(default = "default_min_obstacle_area")]
    pub min_obstacle_area: u32,
    /// Minimum component height in px.
    #[serde(default = "default_min_obstacle_height")]
    pub min_obstacle_height: u32,
    /// Low hysteresis threshold of the edge detector; the high threshold is
    /// twice this value.
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: u32,
    /// HSV saturation above which a pixel is flagged (0–255).
    #[serde(default = "default_saturation_threshold")]
    pub saturation_threshold: u32,
    /// Absolute Laplacian response above which a pixel is flagged (0–255).
    #[serde(default = "default_contrast_threshold")]
    pub contrast_threshold: u32,
    /// Side-zone proximity that raises OBS.
    #[serde(default = "default_dist_threshold_side")]
    pub dist_threshold_side: f32,
    /// Center-zone proximity that raises WARN.
    #[serde(default = "default_dist_threshold_center")]
    pub dist_threshold_center: f32,
    /// Proximity in any zone that raises STOP.
    #[serde(default = "default_dist_threshold_stop")]
    pub dist_threshold_stop: f32,
    /// Fraction of the frame height ignored at the top (sky / far field).
    #[serde(default = "default_roi_top_fraction")]
    pub roi_top_fraction: f32,
    /// Fraction of the frame height ignored at the bottom (robot body).
    #[serde(default = "default_roi_bottom_fraction")]
    pub roi_bottom_fraction: f32,
    /// Consecutive identical classifications required to escalate.
    #[serde(default = "default_hysteresis_window")]
    pub hysteresis_window: usize,

    /// Relative widths of the LEFT, CENTER and RIGHT zones.
    #[serde(default = "default_zone_weights")]
    pub zone_weights: [f32; 3],
    /// Areas below this are "small".
    #[serde(default = "default_size_small_max_area")]
    pub size_small_max_area: u32,
    /// Areas below this (and not small) are "medium"; the rest are "large".
    #[serde(default = "default_size_medium_max_area")]
    pub size_medium_max_area: u32,
    /// Components wider than `max_aspect_ratio × height` are rejected.
    #[serde(default = "default_max_aspect_ratio")]
    pub max_aspect_ratio: f32,
    /// Gaussian pre-blur kernel size (odd, 1 disables).
    #[serde(default = "default_blur_kernel")]
    pub blur_kernel: usize,
    /// Morphological close kernel size (odd).
    #[serde(default = "default_close_kernel")]
    pub close_kernel: usize,
    /// Morphological open kernel size (odd).
    #[serde(default = "default_open_kernel")]
    pub open_kernel: usize,
    /// 3×3 dilation passes applied after close/open.
    #[serde(default = "default_dilate_iterations")]
    pub dilate_iterations: usize,
    /// A side whose nearest obstacle is at or below this proximity counts as
    /// clear when choosing a rotation direction.
    #[serde(default = "default_side_clear_threshold")]
    pub side_clear_threshold: f32,
    /// Cycles spent ROTATING before the robot is reported stuck.
    #[serde(default = "default_stuck_rotation_cycles")]
    pub stuck_rotation_cycles: u32,
    /// Consecutive "frame not ready" cycles before the fail-safe STOP.
    #[serde(default = "default_source_exhaustion_cycles")]
    pub source_exhaustion_cycles: u32,
    /// Soft real-time budget of one cycle, in milliseconds.
    #[serde(default = "default_cycle_budget_ms")]
    pub cycle_budget_ms: u64,
}

fn default_min_obstacle_area() -> u32 {
    4000
}
fn default_min_obstacle_height() -> u32 {
    35
}
fn default_edge_threshold() -> u32 {
    60
}
fn default_saturation_threshold() -> u32 {
    70
}
fn default_contrast_threshold() -> u32 {
    25
}
fn default_dist_threshold_side() -> f32 {
    0.45
}
fn default_dist_threshold_center() -> f32 {
    0.50
}
fn default_dist_threshold_stop() -> f32 {
    0.65
}
fn default_roi_top_fraction() -> f32 {
    0.25
}
fn default_roi_bottom_fraction() -> f32 {
    0.05
}
fn default_hysteresis_window() -> usize {
    2
}
fn default_zone_weights() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
fn default_size_small_max_area() -> u32 {
    5000
}
fn default_size_medium_max_area() -> u32 {
    15000
}
fn default_max_aspect_ratio() -> f32 {
    8.0
}
fn default_blur_kernel() -> usize {
    9
}
fn default_close_kernel() -> usize {
    7
}
fn default_open_kernel() -> usize {
    3
}
fn default_dilate_iterations() -> usize {
    1
}
fn default_side_clear_threshold() -> f32 {
    0.30
}
fn default_stuck_rotation_cycles() -> u32 {
    40
}
fn default_source_exhaustion_cycles() -> u32 {
    20
}
fn default_cycle_budget_ms() -> u64 {
    100
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            min_obstacle_area: default_min_obstacle_area(),
            min_obstacle_height: default_min_obstacle_height(),
            edge_threshold: default_edge_threshold(),
            saturation_threshold: default_saturation_threshold(),
            contrast_threshold: default_contrast_threshold(),
            dist_threshold_side: default_dist_threshold_side(),
            dist_threshold_center: default_dist_threshold_center(),
            dist_threshold_stop: default_dist_threshold_stop(),
            roi_top_fraction: default_roi_top_fraction(),
            roi_bottom_fraction: default_roi_bottom_fraction(),
            hysteresis_window: default_hysteresis_window(),
            zone_weights: default_zone_weights(),
            size_small_max_area: default_size_small_max_area(),
            size_medium_max_area: default_size_medium_max_area(),
            max_aspect_ratio: default_max_aspect_ratio(),
            blur_kernel: default_blur_kernel(),
            close_kernel: default_close_kernel(),
            open_kernel: default_open_kernel(),
            dilate_iterations: default_dilate_iterations(),
            side_clear_threshold: default_side_clear_threshold(),
            stuck_rotation_cycles: default_stuck_rotation_cycles(),
            source_exhaustion_cycles: default_source_exhaustion_cycles(),
            cycle_budget_ms: default_cycle_budget_ms(),
        }
    }
}

impl NavConfig {
    /// Check every option against its admissible range.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), NavError> {
        if self.min_obstacle_area == 0 {
            return Err(NavError::config("min_obstacle_area", "must be positive"));
        }
        if self.min_obstacle_height == 0 {
            return Err(NavError::config("min_obstacle_height", "must be positive"));
        }
        if self.edge_threshold == 0 || self.edge_threshold > 1020 {
            return Err(NavError::config("edge_threshold", "must lie in 1..=1020"));
        }
        check_byte("saturation_threshold", self.saturation_threshold)?;
        check_byte("contrast_threshold", self.contrast_threshold)?;

        check_unit("dist_threshold_side", self.dist_threshold_side)?;
        check_unit("dist_threshold_center", self.dist_threshold_center)?;
        check_unit("dist_threshold_stop", self.dist_threshold_stop)?;
        check_unit("side_clear_threshold", self.side_clear_threshold)?;
        if self.dist_threshold_side > self.dist_threshold_stop {
            return Err(NavError::config(
                "dist_threshold_side",
                "must not exceed dist_threshold_stop",
            ));
        }
        if self.dist_threshold_center > self.dist_threshold_stop {
            return Err(NavError::config(
                "dist_threshold_center",
                "must not exceed dist_threshold_stop",
            ));
        }

        check_fraction("roi_top_fraction", self.roi_top_fraction)?;
        check_fraction("roi_bottom_fraction", self.roi_bottom_fraction)?;
        if self.roi_top_fraction + self.roi_bottom_fraction >= 1.0 {
            return Err(NavError::config(
                "roi_bottom_fraction",
                "top and bottom margins leave no detection band",
            ));
        }

        if self.hysteresis_window == 0 {
            return Err(NavError::config("hysteresis_window", "must be at least 1"));
        }
        if self
            .zone_weights
            .iter()
            .any(|w| !w.is_finite() || *w <= 0.0)
        {
            return Err(NavError::config("zone_weights", "weights must be positive"));
        }
        if self.size_small_max_area > self.size_medium_max_area {
            return Err(NavError::config(
                "size_small_max_area",
                "must not exceed size_medium_max_area",
            ));
        }
        if !self.max_aspect_ratio.is_finite() || self.max_aspect_ratio <= 0.0 {
            return Err(NavError::config("max_aspect_ratio", "must be positive"));
        }
        check_kernel("blur_kernel", self.blur_kernel)?;
        check_kernel("close_kernel", self.close_kernel)?;
        check_kernel("open_kernel", self.open_kernel)?;
        if self.stuck_rotation_cycles == 0 {
            return Err(NavError::config("stuck_rotation_cycles", "must be positive"));
        }
        if self.source_exhaustion_cycles == 0 {
            return Err(NavError::config("source_exhaustion_cycles", "must be positive"));
        }
        if self.cycle_budget_ms == 0 {
            return Err(NavError::config("cycle_budget_ms", "must be positive"));
        }
        Ok(())
    }
}

fn check_byte(field: &str, value: u32) -> Result<(), NavError> {
    if value > 255 {
        return Err(NavError::config(field, format!("{value} exceeds 255")));
    }
    Ok(())
}

fn check_unit(field: &str, value: f32) -> Result<(), NavError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(NavError::config(field, format!("{value} outside [0, 1]")));
    }
    Ok(())
}

fn check_fraction(field: &str, value: f32) -> Result<(), NavError> {
    if !(0.0..1.0).contains(&value) {
        return Err(NavError::config(field, format!("{value} outside [0, 1)")));
    }
    Ok(())
}

fn check_kernel(field: &str, size: usize) -> Result<(), NavError> {
    if size == 0 || size % 2 == 0 {
        return Err(NavError::config(field, format!("{size} must be odd and positive")));
    }
    Ok(())
}
