//! Optional diagnostic channel: annotated frames for human inspection.

use std::fs;
use std::path::{Path, PathBuf};

use hexnav_perception::Detection;
use hexnav_perception::annotate::{annotate, save_png};
use hexnav_types::{Frame, NavError};
use tracing::debug;

/// Receives each processed frame with its detection.  Side effects only;
/// failures are logged by the control loop and never change a decision.
pub trait DiagnosticSink: Send {
    fn publish(&mut self, cycle: u64, frame: &Frame, detection: &Detection) -> Result<(), NavError>;
}

/// Writes an annotated PNG every `every_n` processed cycles.
pub struct PngDiagnostics {
    dir: PathBuf,
    every_n: u64,
    written: u64,
}

impl PngDiagnostics {
    /// Create (if needed) `dir` and write into it.  `every_n` of 0 is
    /// treated as 1.
    pub fn new(dir: &Path, every_n: u64) -> Result<Self, NavError> {
        fs::create_dir_all(dir)
            .map_err(|e| NavError::Diagnostic(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every_n: every_n.max(1),
            written: 0,
        })
    }

    /// Number of images written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl DiagnosticSink for PngDiagnostics {
    fn publish(&mut self, cycle: u64, frame: &Frame, detection: &Detection) -> Result<(), NavError> {
        if cycle % self.every_n != 0 {
            return Ok(());
        }
        let img = annotate(frame, detection)?;
        let path = self.dir.join(format!(
            "cycle_{cycle:06}_{}.png",
            detection.assessment.level.to_string().to_lowercase()
        ));
        save_png(&img, &path)?;
        self.written += 1;
        debug!(path = %path.display(), "diagnostic frame written");
        Ok(())
    }
}
