//! [`ObstacleDetector`] – the stateless Frame → [`DangerAssessment`] pipeline.
//!
//! ```text
//! Frame ─► validate ─► partition ─► {saturation, contrast, edges}
//!                                       │ OR + close/open/dilate/fill
//!                                       ▼
//!                         segment ─► ObstacleCandidate[] ─► classify
//! ```
//!
//! The detector holds only the shared immutable configuration; running it
//! twice on the same frame gives the same result.

use std::sync::Arc;

use hexnav_types::{Frame, NavConfig, NavError};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::classifier::{DangerAssessment, classify};
use crate::roi::{Roi, partition};
use crate::segment::{ObstacleCandidate, fuse, segment};
use crate::signals::SignalSet;

/// Everything the detector learned about one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub roi: Roi,
    /// Nearest first.
    pub candidates: Vec<ObstacleCandidate>,
    pub assessment: DangerAssessment,
}

/// Runs the detection pipeline with one validated configuration.
#[derive(Debug, Clone)]
pub struct ObstacleDetector {
    config: Arc<NavConfig>,
}

impl ObstacleDetector {
    pub fn new(config: Arc<NavConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Detect obstacles in `frame` and classify the danger they pose.
    ///
    /// # Errors
    ///
    /// [`NavError::MalformedFrame`] when the frame fails shape validation or
    /// is too small for a detection band. No signal is extracted in that case.
    #[instrument(name = "detect", skip_all, fields(w = frame.width(), h = frame.height()))]
    pub fn detect(&self, frame: &Frame) -> Result<Detection, NavError> {
        frame.validate()?;
        let roi = partition(frame.width(), frame.height(), &self.config)?;

        let signals = SignalSet::extract(frame, &roi, &self.config);
        debug!(
            saturation = signals.saturation.count(),
            contrast = signals.contrast.count(),
            edges = signals.edges.count(),
            "signal masks"
        );
        let fused = fuse(&signals, &self.config);
        let candidates = segment(&fused, &roi, &self.config);
        let assessment = classify(&candidates, &self.config);
        debug!(
            candidates = candidates.len(),
            level = %assessment.level,
            "frame classified"
        );

        Ok(Detection {
            roi,
            candidates,
            assessment,
        })
    }
}
