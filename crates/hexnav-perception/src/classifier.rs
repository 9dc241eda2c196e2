//! Danger classifier: per-zone nearest proximity → global [`DangerLevel`].
//!
//! Resolution order, most severe first:
//!
//! 1. any zone `≥ dist_threshold_stop` → `STOP`
//! 2. center `≥ dist_threshold_center` → `WARN`
//! 3. both sides `≥ dist_threshold_side` → `WARN` (no safe lateral escape)
//! 4. one side `≥ dist_threshold_side` → `OBS`, flagged with that side
//! 5. otherwise `OK`

use hexnav_types::{DangerLevel, NavConfig, Side, Zone};
use serde::Serialize;

use crate::segment::ObstacleCandidate;

/// Hazard summary of one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DangerAssessment {
    pub level: DangerLevel,
    /// Nearest proximity per zone (indexed by [`Zone::index`]); `None` when
    /// the zone holds no candidate.
    pub readings: [Option<f32>; 3],
    /// Zones that caused `level`, left to right. Empty for `OK`.
    pub triggers: Vec<Zone>,
    /// The hazardous side of an `OBS` reading.
    pub hazard_side: Option<Side>,
}

impl DangerAssessment {
    /// The all-clear assessment.
    pub fn clear() -> Self {
        Self {
            level: DangerLevel::Ok,
            readings: [None; 3],
            triggers: Vec::new(),
            hazard_side: None,
        }
    }

    /// Proximity of `zone`, zero when empty.
    pub fn proximity(&self, zone: Zone) -> f32 {
        self.readings[zone.index()].unwrap_or(0.0)
    }

    /// The single lateral side whose proximity is at most `clear_threshold`,
    /// or `None` when both or neither qualify.
    pub fn clear_side(&self, clear_threshold: f32) -> Option<Side> {
        let left = self.proximity(Zone::Left) <= clear_threshold;
        let right = self.proximity(Zone::Right) <= clear_threshold;
        match (left, right) {
            (true, false) => Some(Side::Left),
            (false, true) => Some(Side::Right),
            _ => None,
        }
    }
}

impl Default for DangerAssessment {
    fn default() -> Self {
        Self::clear()
    }
}

/// Classify a candidate set.
pub fn classify(candidates: &[ObstacleCandidate], config: &NavConfig) -> DangerAssessment {
    let mut readings: [Option<f32>; 3] = [None; 3];
    for c in candidates {
        let slot = &mut readings[c.zone.index()];
        *slot = Some(slot.map_or(c.proximity, |p| p.max(c.proximity)));
    }
    classify_readings(readings, config)
}

/// Classify precomputed per-zone readings.
pub fn classify_readings(readings: [Option<f32>; 3], config: &NavConfig) -> DangerAssessment {
    let prox = |z: Zone| readings[z.index()].unwrap_or(0.0);

    let stop: Vec<Zone> = Zone::ALL
        .into_iter()
        .filter(|z| prox(*z) >= config.dist_threshold_stop)
        .collect();
    if !stop.is_empty() {
        return DangerAssessment {
            level: DangerLevel::Stop,
            readings,
            triggers: stop,
            hazard_side: None,
        };
    }

    if prox(Zone::Center) >= config.dist_threshold_center {
        return DangerAssessment {
            level: DangerLevel::Warn,
            readings,
            triggers: vec![Zone::Center],
            hazard_side: None,
        };
    }

    let left = prox(Zone::Left) >= config.dist_threshold_side;
    let right = prox(Zone::Right) >= config.dist_threshold_side;
    let (level, triggers, hazard_side) = match (left, right) {
        (true, true) => (DangerLevel::Warn, vec![Zone::Left, Zone::Right], None),
        (true, false) => (DangerLevel::Obs, vec![Zone::Left], Some(Side::Left)),
        (false, true) => (DangerLevel::Obs, vec![Zone::Right], Some(Side::Right)),
        (false, false) => (DangerLevel::Ok, Vec::new(), None),
    };
    DangerAssessment {
        level,
        readings,
        triggers,
        hazard_side,
    }
}
