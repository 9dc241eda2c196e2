//! In-process simulation drivers for tests and headless runs.
//!
//! [`SimCamera`] replays a scripted sequence of frames, gaps and faults;
//! [`SimActuator`] records every command it receives.  Together they let the
//! whole control loop run without a camera or servo board attached.
//!
//! # Example
//!
//! ```rust
//! use hexnav_hal::actuator::ActionSink;
//! use hexnav_hal::camera::FrameSource;
//! use hexnav_hal::sim::{SimActuator, SimCamera};
//! use hexnav_types::{Action, Frame, MotionCommand};
//!
//! let mut cam = SimCamera::new("sim_cam")
//!     .then_frame(Frame::solid(64, 48, [120, 120, 120]))
//!     .then_not_ready();
//! assert!(cam.next_frame().unwrap().is_some());
//! assert!(cam.next_frame().unwrap().is_none());
//!
//! let mut gait = SimActuator::new("sim_gait");
//! let log = gait.log();
//! gait.execute(&MotionCommand::new(Action::Advance)).unwrap();
//! assert_eq!(log.commands(), vec![MotionCommand::new(Action::Advance)]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use hexnav_types::{Frame, MotionCommand, NavError};

use crate::actuator::ActionSink;
use crate::camera::FrameSource;

// ────────────────────────────────────────────────────────────────────────────
// Scripted camera
// ────────────────────────────────────────────────────────────────────────────

/// One scripted pull result.
#[derive(Debug, Clone)]
pub enum SimStep {
    Frame(Frame),
    NotReady,
    Fault(String),
}

/// A camera that replays a script.
///
/// When the script runs out it reports "not ready", or starts over when
/// built with [`looping`][Self::looping].
pub struct SimCamera {
    id: String,
    script: Vec<SimStep>,
    cursor: usize,
    looping: bool,
}

impl SimCamera {
    /// An empty script: every pull is "not ready".
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: Vec::new(),
            cursor: 0,
            looping: false,
        }
    }

    pub fn then_frame(mut self, frame: Frame) -> Self {
        self.script.push(SimStep::Frame(frame));
        self
    }

    /// Append the same frame `times` times.
    pub fn then_repeat(mut self, frame: Frame, times: usize) -> Self {
        for _ in 0..times {
            self.script.push(SimStep::Frame(frame.clone()));
        }
        self
    }

    pub fn then_not_ready(mut self) -> Self {
        self.script.push(SimStep::NotReady);
        self
    }

    pub fn then_fault(mut self, details: impl Into<String>) -> Self {
        self.script.push(SimStep::Fault(details.into()));
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// A looping scene: clear floor, then a red box rising from the far
    /// field into the near field in the middle of the view, then clear
    /// floor again.
    pub fn approaching_obstacle(id: impl Into<String>, width: u32, height: u32, steps: u32) -> Self {
        let floor = [110, 110, 110];
        let box_w = (width / 6).max(1);
        let box_h = (height / 5).max(1);
        let x = width / 2 - box_w / 2;
        let steps = steps.max(1);

        let mut cam = Self::new(id).then_repeat(Frame::solid(width, height, floor), 5);
        for i in 0..steps {
            let bottom = height / 3 + (height * 3 / 5) * i / steps;
            let y = bottom.saturating_sub(box_h);
            cam = cam.then_frame(Frame::solid(width, height, floor).with_rect(x, y, box_w, box_h, [200, 30, 30]));
        }
        cam.then_repeat(Frame::solid(width, height, floor), 5).looping(true)
    }

    /// Number of scripted steps.
    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }
}

impl FrameSource for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, NavError> {
        if self.cursor >= self.script.len() {
            if !self.looping || self.script.is_empty() {
                return Ok(None);
            }
            self.cursor = 0;
        }
        let step = self.script[self.cursor].clone();
        self.cursor += 1;
        match step {
            SimStep::Frame(frame) => Ok(Some(frame)),
            SimStep::NotReady => Ok(None),
            SimStep::Fault(details) => Err(NavError::SourceFault {
                source_id: self.id.clone(),
                details,
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording actuator
// ────────────────────────────────────────────────────────────────────────────

/// Shared view of the commands a [`SimActuator`] received.
#[derive(Debug, Clone, Default)]
pub struct CommandLog(Arc<Mutex<VecDeque<MotionCommand>>>);

impl CommandLog {
    /// Snapshot of all recorded commands, oldest first.
    pub fn commands(&self) -> Vec<MotionCommand> {
        let guard = self.0.lock().unwrap_or_else(|p| p.into_inner());
        guard.iter().copied().collect()
    }

    /// The most recent command, if any.
    pub fn last(&self) -> Option<MotionCommand> {
        let guard = self.0.lock().unwrap_or_else(|p| p.into_inner());
        guard.back().copied()
    }

    fn push(&self, command: MotionCommand) {
        let mut guard = self.0.lock().unwrap_or_else(|p| p.into_inner());
        guard.push_back(command);
    }
}

/// An action sink that records every command.  Optionally faulty, to
/// exercise actuator error paths.
pub struct SimActuator {
    id: String,
    log: CommandLog,
    faulty: bool,
}

impl SimActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: CommandLog::default(),
            faulty: false,
        }
    }

    /// A sink whose every `execute` fails with [`NavError::ActuatorFault`].
    pub fn faulty(id: impl Into<String>) -> Self {
        Self {
            faulty: true,
            ..Self::new(id)
        }
    }

    /// Handle on the recorded commands; stays valid after the actuator is
    /// moved into a control loop.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

impl ActionSink for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&mut self, command: &MotionCommand) -> Result<(), NavError> {
        if self.faulty {
            return Err(NavError::ActuatorFault {
                component: self.id.clone(),
                details: format!("servo bus rejected {command}"),
            });
        }
        self.log.push(*command);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hexnav_types::{Action, Side};

    #[test]
    fn script_plays_in_order_then_runs_dry() {
        let mut cam = SimCamera::new("cam")
            .then_frame(Frame::solid(4, 4, [0, 0, 0]))
            .then_not_ready()
            .then_fault("lens cap");
        assert_eq!(cam.len(), 3);
        assert!(cam.next_frame().unwrap().is_some());
        assert!(cam.next_frame().unwrap().is_none());
        assert!(matches!(cam.next_frame(), Err(NavError::SourceFault { .. })));
        assert!(cam.next_frame().unwrap().is_none());
    }

    #[test]
    fn looping_script_restarts() {
        let mut cam = SimCamera::new("cam").then_frame(Frame::solid(2, 2, [1, 2, 3])).looping(true);
        for _ in 0..4 {
            assert!(cam.next_frame().unwrap().is_some());
        }
    }

    #[test]
    fn empty_looping_script_is_never_ready() {
        let mut cam = SimCamera::new("cam").looping(true);
        assert!(cam.is_empty());
        assert!(cam.next_frame().unwrap().is_none());
    }

    #[test]
    fn approaching_scene_is_valid() {
        let mut cam = SimCamera::approaching_obstacle("cam", 160, 120, 10);
        assert_eq!(cam.len(), 20);
        for _ in 0..cam.len() {
            let frame = cam.next_frame().unwrap().unwrap();
            assert!(frame.validate().is_ok());
        }
    }

    #[test]
    fn actuator_records_commands() {
        let mut act = SimActuator::new("gait");
        let log = act.log();
        act.execute(&MotionCommand::new(Action::Advance)).unwrap();
        act.execute(&MotionCommand::rotate(Side::Right)).unwrap();
        assert_eq!(log.commands().len(), 2);
        assert_eq!(log.last(), Some(MotionCommand::rotate(Side::Right)));
    }

    #[test]
    fn faulty_actuator_reports_fault() {
        let mut act = SimActuator::faulty("gait");
        let err = act.execute(&MotionCommand::new(Action::Stop)).unwrap_err();
        assert!(matches!(err, NavError::ActuatorFault { .. }));
        assert!(act.log().commands().is_empty());
    }
}
