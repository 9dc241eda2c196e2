//! [`ControlLoop`] – the synchronous acquire → detect → decide → act cycle.
//!
//! Each [`tick`][ControlLoop::tick]:
//!
//! 1. **Control** – apply pause / resume / stop requests queued on the
//!    [`ControlHandle`] since the last cycle.
//! 2. **Acquire** – pull a frame from the [`FrameSource`]; a missing frame
//!    skips the cycle and counts towards source exhaustion.
//! 3. **Detect** – run the [`ObstacleDetector`]; a malformed frame is
//!    rejected and the previous command is re-issued unchanged, until
//!    `source_exhaustion_cycles` rejections in a row force a fail-safe stop.
//! 4. **Decide** – feed the assessment to the [`NavigationPolicy`].
//! 5. **Act** – push exactly one command to the [`ActionSink`].
//!
//! Nothing inside a cycle blocks on I/O or spawns threads; pacing happens
//! between cycles in [`run`][ControlLoop::run].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hexnav_hal::sim::{SimActuator, SimCamera};
//! use hexnav_runtime::control_loop::{ControlLoop, CycleOutcome};
//! use hexnav_types::{Action, Frame, NavConfig};
//!
//! let camera = SimCamera::new("cam").then_frame(Frame::solid(64, 48, [90, 90, 90]));
//! let gait = SimActuator::new("gait");
//! let log = gait.log();
//!
//! let mut control = ControlLoop::new(Arc::new(NavConfig::default()), camera, gait).unwrap();
//! let report = control.tick().unwrap();
//! assert_eq!(report.outcome, CycleOutcome::Processed);
//! assert_eq!(log.last().map(|c| c.action), Some(Action::Advance));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hexnav_hal::{ActionSink, FrameSource, step_delay};
use hexnav_perception::{DangerAssessment, ObstacleDetector};
use hexnav_types::{MotionCommand, NavConfig, NavError};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::diagnostics::DiagnosticSink;
use crate::policy::{Decision, NavMode, NavigationPolicy, Transition, TransitionCause};

const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

// ─────────────────────────────────────────────────────────────────────────────
// Out-of-band control
// ─────────────────────────────────────────────────────────────────────────────

const REQ_NONE: u8 = 0;
const REQ_PAUSE: u8 = 1;
const REQ_RESUME: u8 = 2;

#[derive(Default)]
struct ControlFlags {
    /// Latest pause/resume request; later requests overwrite earlier ones.
    pause_resume: AtomicU8,
    stop: AtomicBool,
}

/// Cloneable handle for requesting pause, resume or stop from another
/// thread (operator prompt, Ctrl-C handler).  Requests are honoured at the
/// next cycle boundary; repeating one is harmless.
#[derive(Clone, Default)]
pub struct ControlHandle {
    flags: Arc<ControlFlags>,
}

impl ControlHandle {
    pub fn pause(&self) {
        self.flags.pause_resume.store(REQ_PAUSE, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.flags.pause_resume.store(REQ_RESUME, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.flags.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flags.stop.load(Ordering::SeqCst)
    }

    fn take_pause_resume(&self) -> u8 {
        self.flags.pause_resume.swap(REQ_NONE, Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────────────────────────

/// How a cycle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A fresh frame was classified and fed to the policy.
    Processed,
    /// No frame was ready (or the source faulted).
    Skipped,
    /// The frame failed validation; the previous command was re-issued.
    Rejected,
    /// Hazard-driven navigation is suspended.
    Paused,
    /// The loop was shut down.
    Stopped,
}

/// Result of one [`ControlLoop::tick`].
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    /// Latest assessment; carried over from the last processed frame when
    /// this cycle had none.
    pub assessment: DangerAssessment,
    pub mode: NavMode,
    pub command: MotionCommand,
    pub transition: Option<Transition>,
    pub stuck: bool,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Running counters of a control loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub cycles: u64,
    pub processed: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub paused: u64,
    pub transitions: u64,
    pub stuck_cycles: u64,
    pub over_budget: u64,
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Drives detection and navigation against one frame source and one action
/// sink.
pub struct ControlLoop<S: FrameSource, A: ActionSink> {
    config: Arc<NavConfig>,
    source: S,
    sink: A,
    detector: ObstacleDetector,
    policy: NavigationPolicy,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
    handle: ControlHandle,
    last_assessment: DangerAssessment,
    /// Consecutive rejected frames; kept here so a lone rejection leaves
    /// the policy untouched.
    rejected_streak: u32,
    stats: LoopStats,
    stopped: bool,
    window_start: Instant,
    window_processed: u64,
}

impl<S: FrameSource, A: ActionSink> ControlLoop<S, A> {
    /// Build a loop in `Advancing` mode.
    ///
    /// # Errors
    ///
    /// [`NavError::Config`] when `config` fails validation.
    pub fn new(config: Arc<NavConfig>, source: S, sink: A) -> Result<Self, NavError> {
        config.validate()?;
        info!(source = source.id(), sink = sink.id(), window = config.hysteresis_window, "control loop ready");
        Ok(Self {
            detector: ObstacleDetector::new(Arc::clone(&config)),
            policy: NavigationPolicy::new(Arc::clone(&config)),
            config,
            source,
            sink,
            diagnostics: None,
            handle: ControlHandle::default(),
            last_assessment: DangerAssessment::clear(),
            rejected_streak: 0,
            stats: LoopStats::default(),
            stopped: false,
            window_start: Instant::now(),
            window_processed: 0,
        })
    }

    /// Attach a diagnostic sink fed with every processed frame.
    pub fn with_diagnostics(mut self, diagnostics: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// A handle for out-of-band pause / resume / stop.
    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn policy(&self) -> &NavigationPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Run exactly one cycle.
    ///
    /// # Errors
    ///
    /// Only [`NavError::ActuatorFault`] (or another error raised by the
    /// sink) escapes; frame-level problems are absorbed into the report.
    pub fn tick(&mut self) -> Result<CycleReport, NavError> {
        let start = Instant::now();
        self.stats.cycles += 1;
        let cycle = self.stats.cycles;
        let span = info_span!("cycle", n = cycle);
        let _enter = span.enter();

        if self.stopped {
            return Ok(self.report(cycle, CycleOutcome::Stopped, self.policy.current(), start));
        }

        let operator = self.apply_requests();

        if self.policy.mode() == NavMode::Stopped {
            self.stopped = true;
            let decision = self.policy.current();
            self.sink.execute(&decision.command)?;
            let decision = Decision {
                transition: operator.or(decision.transition),
                ..decision
            };
            return Ok(self.finish(cycle, CycleOutcome::Stopped, decision, start));
        }

        if self.policy.mode() == NavMode::Paused {
            let decision = self.policy.current();
            self.sink.execute(&decision.command)?;
            let decision = Decision {
                transition: operator.or(decision.transition),
                ..decision
            };
            return Ok(self.finish(cycle, CycleOutcome::Paused, decision, start));
        }

        let (outcome, decision) = match self.source.next_frame() {
            Ok(Some(frame)) => match self.detector.detect(&frame) {
                Ok(detection) => {
                    self.rejected_streak = 0;
                    let decision = self.policy.decide(&detection.assessment);
                    if let Some(diag) = self.diagnostics.as_mut()
                        && let Err(e) = diag.publish(cycle, &frame, &detection) {
                            warn!(error = %e, "diagnostic output failed");
                        }
                    self.last_assessment = detection.assessment;
                    (CycleOutcome::Processed, decision)
                }
                Err(e) => {
                    self.rejected_streak = self.rejected_streak.saturating_add(1);
                    warn!(error = %e, streak = self.rejected_streak, "frame rejected");
                    let decision = if self.rejected_streak >= self.config.source_exhaustion_cycles {
                        self.policy.fail_safe(TransitionCause::FramesRejected)
                    } else {
                        self.policy.current()
                    };
                    (CycleOutcome::Rejected, decision)
                }
            },
            Ok(None) => (CycleOutcome::Skipped, self.policy.source_not_ready()),
            Err(e) => {
                warn!(error = %e, source = self.source.id(), "frame source fault, skipping cycle");
                (CycleOutcome::Skipped, self.policy.source_not_ready())
            }
        };

        self.sink.execute(&decision.command)?;
        let decision = Decision {
            transition: decision.transition.or(operator),
            ..decision
        };
        Ok(self.finish(cycle, outcome, decision, start))
    }

    /// Tick until stopped, pacing cycles by the gait cadence of the current
    /// command.
    ///
    /// # Errors
    ///
    /// Propagates the first action-sink failure.
    pub fn run(&mut self) -> Result<LoopStats, NavError> {
        loop {
            let report = self.tick()?;
            if report.outcome == CycleOutcome::Stopped {
                info!(
                    cycles = self.stats.cycles,
                    processed = self.stats.processed,
                    skipped = self.stats.skipped,
                    rejected = self.stats.rejected,
                    "control loop stopped"
                );
                return Ok(self.stats.clone());
            }
            let pause = step_delay(report.command.action).saturating_sub(report.elapsed);
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }
    }

    fn apply_requests(&mut self) -> Option<Transition> {
        if self.handle.is_stop_requested() {
            return self.policy.shutdown().transition;
        }
        match self.handle.take_pause_resume() {
            REQ_PAUSE => self.policy.pause().transition,
            REQ_RESUME => self.policy.resume().transition,
            _ => None,
        }
    }

    fn finish(&mut self, cycle: u64, outcome: CycleOutcome, decision: Decision, start: Instant) -> CycleReport {
        match outcome {
            CycleOutcome::Processed => {
                self.stats.processed += 1;
                self.window_processed += 1;
            }
            CycleOutcome::Skipped => self.stats.skipped += 1,
            CycleOutcome::Rejected => self.stats.rejected += 1,
            CycleOutcome::Paused => self.stats.paused += 1,
            CycleOutcome::Stopped => {}
        }
        if decision.transition.is_some() {
            self.stats.transitions += 1;
        }
        if decision.stuck {
            self.stats.stuck_cycles += 1;
        }

        let report = self.report(cycle, outcome, decision, start);
        let budget = Duration::from_millis(self.config.cycle_budget_ms);
        if report.elapsed > budget {
            self.stats.over_budget += 1;
            warn!(
                elapsed_ms = report.elapsed.as_millis() as u64,
                budget_ms = self.config.cycle_budget_ms,
                "cycle over budget"
            );
        }
        debug!(
            outcome = ?report.outcome,
            level = %report.assessment.level,
            command = %report.command,
            "cycle done"
        );
        self.maybe_summarise();
        report
    }

    fn report(&self, cycle: u64, outcome: CycleOutcome, decision: Decision, start: Instant) -> CycleReport {
        CycleReport {
            cycle,
            outcome,
            assessment: self.last_assessment.clone(),
            mode: decision.mode,
            command: decision.command,
            transition: decision.transition,
            stuck: decision.stuck,
            elapsed: start.elapsed(),
        }
    }

    fn maybe_summarise(&mut self) {
        let since = self.window_start.elapsed();
        if since < SUMMARY_INTERVAL {
            return;
        }
        let rate = self.window_processed as f64 / since.as_secs_f64();
        info!(
            detections_per_sec = (rate * 10.0).round() / 10.0,
            mode = %self.policy.mode(),
            skipped = self.stats.skipped,
            rejected = self.stats.rejected,
            "navigation summary"
        );
        self.window_start = Instant::now();
        self.window_processed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexnav_hal::sim::{CommandLog, SimActuator, SimCamera};
    use hexnav_types::{Action, DangerLevel, Frame};

    const GRAY: [u8; 3] = [128, 128, 128];

    fn config(k: usize, exhaustion: u32) -> Arc<NavConfig> {
        Arc::new(NavConfig {
            hysteresis_window: k,
            source_exhaustion_cycles: exhaustion,
            cycle_budget_ms: 10_000,
            ..NavConfig::default()
        })
    }

    fn clear_frame() -> Frame {
        Frame::solid(160, 120, GRAY)
    }

    fn build(camera: SimCamera, k: usize, exhaustion: u32) -> (ControlLoop<SimCamera, SimActuator>, CommandLog) {
        let gait = SimActuator::new("gait");
        let log = gait.log();
        (ControlLoop::new(config(k, exhaustion), camera, gait).unwrap(), log)
    }

    #[test]
    fn invalid_config_is_fatal() {
        let cfg = Arc::new(NavConfig {
            hysteresis_window: 0,
            ..NavConfig::default()
        });
        let result = ControlLoop::new(cfg, SimCamera::new("cam"), SimActuator::new("gait"));
        assert!(matches!(result, Err(NavError::Config { .. })));
    }

    #[test]
    fn one_command_per_cycle() {
        let cam = SimCamera::new("cam").then_frame(clear_frame()).then_not_ready().then_frame(clear_frame());
        let (mut control, log) = build(cam, 2, 20);
        for _ in 0..3 {
            control.tick().unwrap();
        }
        assert_eq!(log.commands().len(), 3);
        assert!(log.commands().iter().all(|c| c.action == Action::Advance));
        assert_eq!(control.stats().processed, 2);
        assert_eq!(control.stats().skipped, 1);
    }

    #[test]
    fn malformed_frame_reissues_previous_command() {
        let cam = SimCamera::new("cam")
            .then_frame(clear_frame())
            .then_frame(Frame::new(0, 120, Vec::new()));
        let (mut control, log) = build(cam, 1, 20);
        control.tick().unwrap();
        let before = control.policy().current();
        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Rejected);
        assert_eq!(report.command, before.command);
        assert!(report.transition.is_none());
        assert_eq!(control.policy().current(), before);
        assert_eq!(log.commands().len(), 2);
    }

    #[test]
    fn exhausted_source_stops_then_recovers() {
        let mut cam = SimCamera::new("cam");
        for _ in 0..3 {
            cam = cam.then_not_ready();
        }
        cam = cam.then_fault("usb reset").then_frame(clear_frame());
        let (mut control, log) = build(cam, 2, 3);

        let outcomes: Vec<CycleOutcome> = (0..3).map(|_| control.tick().unwrap().outcome).collect();
        assert_eq!(outcomes, vec![CycleOutcome::Skipped; 3]);
        assert_eq!(log.last().map(|c| c.action), Some(Action::Stop));
        assert_eq!(control.policy().mode(), NavMode::FailSafe);

        // A source fault counts as another miss.
        assert_eq!(control.tick().unwrap().outcome, CycleOutcome::Skipped);
        assert_eq!(log.last().map(|c| c.action), Some(Action::Stop));

        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(report.command.action, Action::Advance);
        assert!(report.transition.is_some());
    }

    #[test]
    fn repeated_rejections_fail_safe() {
        let mut cam = SimCamera::new("cam").then_frame(clear_frame());
        for _ in 0..5 {
            cam = cam.then_frame(Frame::new(0, 120, Vec::new()));
        }
        let (mut control, log) = build(cam.then_frame(clear_frame()), 2, 3);
        control.tick().unwrap();

        let actions: Vec<Action> = (0..5)
            .map(|_| {
                let report = control.tick().unwrap();
                assert_eq!(report.outcome, CycleOutcome::Rejected);
                report.command.action
            })
            .collect();
        assert_eq!(
            actions,
            vec![Action::Advance, Action::Advance, Action::Stop, Action::Stop, Action::Stop]
        );
        assert_eq!(control.policy().mode(), NavMode::FailSafe);
        assert_eq!(control.stats().transitions, 1);

        // A valid frame ends the fail-safe and the streak.
        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(report.transition.map(|t| t.cause), Some(TransitionCause::SourceRecovered));
        assert_eq!(log.last().map(|c| c.action), Some(Action::Advance));
    }

    #[test]
    fn valid_frame_resets_rejection_streak() {
        let bad = || Frame::new(160, 0, Vec::new());
        let cam = SimCamera::new("cam")
            .then_frame(bad())
            .then_frame(bad())
            .then_frame(clear_frame())
            .then_frame(bad())
            .then_frame(bad());
        let (mut control, _log) = build(cam, 2, 3);
        for _ in 0..5 {
            assert_eq!(control.tick().unwrap().command.action, Action::Advance);
        }
        assert_eq!(control.policy().mode(), NavMode::Advancing);
    }

    #[test]
    fn pause_resume_and_stop_via_handle() {
        let cam = SimCamera::new("cam").then_frame(clear_frame()).looping(true);
        let (mut control, log) = build(cam, 2, 20);
        let handle = control.handle();

        control.tick().unwrap();
        handle.pause();
        handle.pause();
        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Paused);
        assert_eq!(report.command.action, Action::Paused);
        assert!(report.transition.is_some());
        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Paused);
        assert!(report.transition.is_none());

        handle.resume();
        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(report.command.action, Action::Advance);
        assert!(report.transition.is_some());

        handle.stop();
        let report = control.tick().unwrap();
        assert_eq!(report.outcome, CycleOutcome::Stopped);
        assert_eq!(report.command.action, Action::Stop);
        let sent = log.commands().len();
        assert_eq!(control.tick().unwrap().outcome, CycleOutcome::Stopped);
        assert_eq!(log.commands().len(), sent);
    }

    #[test]
    fn run_returns_when_stopped() {
        let cam = SimCamera::new("cam").then_frame(clear_frame()).looping(true);
        let (mut control, _log) = build(cam, 2, 20);
        control.handle().stop();
        let stats = control.run().unwrap();
        assert_eq!(stats.cycles, 1);
    }

    #[test]
    fn actuator_fault_escapes_tick() {
        let cam = SimCamera::new("cam").then_frame(clear_frame());
        let mut control = ControlLoop::new(config(2, 20), cam, SimActuator::faulty("gait")).unwrap();
        assert!(matches!(control.tick(), Err(NavError::ActuatorFault { .. })));
    }

    #[test]
    fn skipped_cycle_carries_last_assessment() {
        let near = Frame::solid(160, 120, GRAY).with_rect(45, 40, 70, 70, [230, 20, 20]);
        let cam = SimCamera::new("cam").then_frame(near).then_not_ready();
        let (mut control, _log) = build(cam, 2, 20);
        let first = control.tick().unwrap();
        let second = control.tick().unwrap();
        assert_eq!(second.outcome, CycleOutcome::Skipped);
        assert_eq!(second.assessment, first.assessment);
        assert_ne!(first.assessment.level, DangerLevel::Ok);
    }
}
