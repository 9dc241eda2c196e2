//! `hexnav-runtime` – navigation decisions and the control loop.
//!
//! # Modules
//!
//! - [`policy`] – [`NavigationPolicy`][policy::NavigationPolicy]: the
//!   hysteretic state machine that turns a stream of
//!   [`DangerAssessment`][hexnav_perception::DangerAssessment]s into movement
//!   commands, with operator pause/resume/shutdown, stuck-rotation reporting
//!   and a fail-safe stop when the camera goes quiet.
//! - [`hysteresis`] – [`HysteresisWindow`][hysteresis::HysteresisWindow]:
//!   rolling agreement check that gates escalation.
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: the
//!   synchronous acquire → detect → decide → act cycle, paced by the gait
//!   cadence and steerable through a [`ControlHandle`][control_loop::ControlHandle].
//! - [`diagnostics`] – optional annotated-frame output.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console/JSON
//!   logs plus optional OTLP span export.

pub mod control_loop;
pub mod diagnostics;
pub mod hysteresis;
pub mod policy;
pub mod telemetry;

pub use control_loop::{ControlHandle, ControlLoop, CycleOutcome, CycleReport, LoopStats};
pub use diagnostics::{DiagnosticSink, PngDiagnostics};
pub use hysteresis::HysteresisWindow;
pub use policy::{Decision, NavMode, NavigationPolicy, Transition, TransitionCause};
pub use telemetry::{TracerProviderGuard, init_tracing};
