//! Action-sink capability for the gait controller.
//!
//! The navigation core hands exactly one [`MotionCommand`] per cycle to an
//! [`ActionSink`]; how the command becomes servo motion is the sink's
//! business.  Drivers can be swapped without touching detection or policy.

use std::time::Duration;

use hexnav_types::{Action, MotionCommand, NavError};
use tracing::{debug, info};

/// Receives the command of every control cycle.
pub trait ActionSink: Send {
    /// Stable identifier, e.g. `"gait"`.
    fn id(&self) -> &str;

    /// Execute (or schedule) one command.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::ActuatorFault`] if the command cannot be applied.
    fn execute(&mut self, command: &MotionCommand) -> Result<(), NavError>;
}

/// Pause between two gait steps of `action`, used to pace the control loop.
pub fn step_delay(action: Action) -> Duration {
    let ms = match action {
        Action::Advance => 80,
        Action::TranslateLeft | Action::TranslateRight | Action::Rotate => 150,
        Action::Circumvent | Action::Stop | Action::Paused => 100,
    };
    Duration::from_millis(ms)
}

/// A sink that only logs: `info!` when the command changes, `debug!` on
/// repeats.
pub struct LoggingActionSink {
    id: String,
    last: Option<MotionCommand>,
}

impl LoggingActionSink {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last: None,
        }
    }
}

impl ActionSink for LoggingActionSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&mut self, command: &MotionCommand) -> Result<(), NavError> {
        if self.last.as_ref() != Some(command) {
            info!(sink = %self.id, command = %command, "gait command");
            self.last = Some(*command);
        } else {
            debug!(sink = %self.id, command = %command, "gait command (repeat)");
        }
        Ok(())
    }
}
