//! `hexnav-hal` – the boundary between the navigation core and the robot.
//!
//! The core only ever talks to two capabilities, so backends can be swapped
//! without touching detection or policy code:
//!
//! - [`camera`] – [`FrameSource`][camera::FrameSource]: non-blocking pull of
//!   the next [`Frame`][hexnav_types::Frame], with the
//!   [`CameraBackend`][camera::CameraBackend] chosen at startup and a
//!   channel-fed source for threaded capture adapters.
//! - [`image_dir`] – [`ImageDirSource`][image_dir::ImageDirSource]: replays a
//!   directory of still images.
//! - [`actuator`] – [`ActionSink`][actuator::ActionSink]: receives one
//!   [`MotionCommand`][hexnav_types::MotionCommand] per cycle, plus the gait
//!   cadence table.
//! - [`sim`] – scripted camera and recording actuator for tests and
//!   headless runs.

pub mod actuator;
pub mod camera;
pub mod image_dir;
pub mod sim;

pub use actuator::{ActionSink, LoggingActionSink, step_delay};
pub use camera::{CameraBackend, ChannelSource, FrameSource};
