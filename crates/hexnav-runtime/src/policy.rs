//! [`NavigationPolicy`] – hysteretic state machine from danger assessments
//! to movement commands.
//!
//! # Modes
//!
//! | Mode                | Command            | Restrictiveness | Entered by                     |
//! |---------------------|--------------------|-----------------|--------------------------------|
//! | `Advancing`         | `ADVANCE`          | 0               | `OK`, startup, resume          |
//! | `TranslatingLeft`   | `TRANSLATE_LEFT`   | 1               | `OBS` on the right             |
//! | `TranslatingRight`  | `TRANSLATE_RIGHT`  | 1               | `OBS` on the left              |
//! | `Circumventing`     | `CIRCUMVENT`       | 2               | `WARN`                         |
//! | `Rotating`          | `ROTATE(side)`     | 3               | `STOP`                         |
//! | `FailSafe`          | `STOP`             | 4               | no valid frame for too long    |
//! | `Paused`            | `PAUSED`           | –               | operator pause                 |
//! | `Stopped`           | `STOP`             | –               | operator shutdown (terminal)   |
//!
//! Moving to a more restrictive mode, or switching between the two lateral
//! translations, requires the last `hysteresis_window` assessments to point
//! at the same mode.  Moving to a less restrictive mode happens on the first
//! reading that allows it.  `FailSafe` outranks every hazard mode, so the
//! first valid frame after it moves straight to the mode that frame calls
//! for, never further.

use std::fmt;
use std::sync::Arc;

use hexnav_perception::DangerAssessment;
use hexnav_types::{Action, DangerLevel, MotionCommand, NavConfig, Side};
use serde::Serialize;
use tracing::{info, warn};

use crate::hysteresis::HysteresisWindow;

// ────────────────────────────────────────────────────────────────────────────
// Modes and decisions
// ────────────────────────────────────────────────────────────────────────────

/// The policy's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavMode {
    Advancing,
    TranslatingLeft,
    TranslatingRight,
    Circumventing,
    Rotating,
    FailSafe,
    Paused,
    Stopped,
}

impl NavMode {
    /// The action carried out while in this mode.
    pub fn action(self) -> Action {
        match self {
            NavMode::Advancing => Action::Advance,
            NavMode::TranslatingLeft => Action::TranslateLeft,
            NavMode::TranslatingRight => Action::TranslateRight,
            NavMode::Circumventing => Action::Circumvent,
            NavMode::Rotating => Action::Rotate,
            NavMode::FailSafe | NavMode::Stopped => Action::Stop,
            NavMode::Paused => Action::Paused,
        }
    }

    /// Restrictiveness rank of hazard-driven modes; `None` for the others.
    pub fn rank(self) -> Option<u8> {
        match self {
            NavMode::Advancing => Some(0),
            NavMode::TranslatingLeft | NavMode::TranslatingRight => Some(1),
            NavMode::Circumventing => Some(2),
            NavMode::Rotating => Some(3),
            NavMode::FailSafe => Some(4),
            NavMode::Paused | NavMode::Stopped => None,
        }
    }

    /// The hazard-driven mode an assessment points at.
    pub fn for_assessment(assessment: &DangerAssessment) -> NavMode {
        match assessment.level {
            DangerLevel::Ok => NavMode::Advancing,
            DangerLevel::Obs => match assessment.hazard_side {
                Some(Side::Left) => NavMode::TranslatingRight,
                Some(Side::Right) => NavMode::TranslatingLeft,
                None => NavMode::Circumventing,
            },
            DangerLevel::Warn => NavMode::Circumventing,
            DangerLevel::Stop => NavMode::Rotating,
        }
    }
}

impl fmt::Display for NavMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NavMode::Advancing => "ADVANCING",
            NavMode::TranslatingLeft => "TRANSLATING_LEFT",
            NavMode::TranslatingRight => "TRANSLATING_RIGHT",
            NavMode::Circumventing => "CIRCUMVENTING",
            NavMode::Rotating => "ROTATING",
            NavMode::FailSafe => "FAIL_SAFE",
            NavMode::Paused => "PAUSED",
            NavMode::Stopped => "STOPPED",
        };
        f.write_str(label)
    }
}

/// What caused a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    Hazard,
    Operator,
    SourceExhausted,
    /// Too many consecutive frames failed validation.
    FramesRejected,
    SourceRecovered,
}

/// A mode entry, reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: NavMode,
    pub to: NavMode,
    pub cause: TransitionCause,
}

/// The outcome of one policy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub mode: NavMode,
    /// The current command; identical across cycles spent in one mode
    /// (apart from the turning side while rotating).
    pub command: MotionCommand,
    /// `Some` only on the cycle a new mode was entered.
    pub transition: Option<Transition>,
    /// Rotation has lasted beyond `stuck_rotation_cycles`.
    pub stuck: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

/// Owns all cross-frame navigation state.
pub struct NavigationPolicy {
    config: Arc<NavConfig>,
    mode: NavMode,
    window: HysteresisWindow<NavMode>,
    turn: Side,
    rotation_cycles: u32,
    not_ready_streak: u32,
}

impl NavigationPolicy {
    /// A policy in `Advancing` with empty history.
    pub fn new(config: Arc<NavConfig>) -> Self {
        let window = HysteresisWindow::new(config.hysteresis_window);
        Self {
            config,
            mode: NavMode::Advancing,
            window,
            turn: Side::Left,
            rotation_cycles: 0,
            not_ready_streak: 0,
        }
    }

    pub fn mode(&self) -> NavMode {
        self.mode
    }

    /// The current command.  Idempotent.
    pub fn current_command(&self) -> MotionCommand {
        match self.mode {
            NavMode::Rotating => MotionCommand::rotate(self.turn),
            mode => MotionCommand::new(mode.action()),
        }
    }

    /// The current decision without advancing any state.  Used to re-issue
    /// the last command when a frame is rejected.
    pub fn current(&self) -> Decision {
        self.decision(None)
    }

    pub fn is_stuck(&self) -> bool {
        self.mode == NavMode::Rotating && self.rotation_cycles > self.config.stuck_rotation_cycles
    }

    /// Number of consecutive cycles without a frame.
    pub fn not_ready_streak(&self) -> u32 {
        self.not_ready_streak
    }

    /// Feed one fresh assessment.
    pub fn decide(&mut self, assessment: &DangerAssessment) -> Decision {
        if matches!(self.mode, NavMode::Paused | NavMode::Stopped) {
            return self.current();
        }
        self.not_ready_streak = 0;

        let from = self.mode;
        let target = NavMode::for_assessment(assessment);
        let settled = self.window.record(target);
        let allowed = match (target.rank(), from.rank()) {
            (Some(t), Some(f)) if t < f => true,
            (Some(t), Some(f)) if t == f => target == from || settled,
            _ => settled,
        };
        if allowed && target != from {
            self.enter(target);
        }

        if self.mode == NavMode::Rotating {
            if from != NavMode::Rotating {
                self.rotation_cycles = 0;
            }
            self.rotation_cycles = self.rotation_cycles.saturating_add(1);
            if let Some(side) = assessment.clear_side(self.config.side_clear_threshold) {
                self.turn = side;
            }
            if self.rotation_cycles == self.config.stuck_rotation_cycles + 1 {
                warn!(cycles = self.rotation_cycles, "rotation is not clearing the hazard, robot may be stuck");
            }
        }

        let transition = (self.mode != from).then(|| Transition {
            from,
            to: self.mode,
            cause: if from == NavMode::FailSafe {
                TransitionCause::SourceRecovered
            } else {
                TransitionCause::Hazard
            },
        });
        if let Some(t) = &transition {
            info!(from = %t.from, to = %t.to, cause = ?t.cause, level = %assessment.level, "navigation mode changed");
        }
        self.decision(transition)
    }

    /// Record a cycle in which the frame source had nothing to offer.
    ///
    /// After `source_exhaustion_cycles` consecutive misses the policy enters
    /// `FailSafe` and commands `STOP` until a fresh frame arrives.
    pub fn source_not_ready(&mut self) -> Decision {
        if matches!(self.mode, NavMode::Paused | NavMode::Stopped | NavMode::FailSafe) {
            return self.current();
        }
        self.not_ready_streak = self.not_ready_streak.saturating_add(1);
        if self.not_ready_streak < self.config.source_exhaustion_cycles {
            return self.current();
        }
        warn!(misses = self.not_ready_streak, "frame source exhausted");
        self.fail_safe(TransitionCause::SourceExhausted)
    }

    /// Halt with `STOP` until the next valid assessment.  Used when the
    /// caller has gone too long without one; idempotent.
    pub fn fail_safe(&mut self, cause: TransitionCause) -> Decision {
        if matches!(self.mode, NavMode::Paused | NavMode::Stopped | NavMode::FailSafe) {
            return self.current();
        }
        let from = self.mode;
        self.enter(NavMode::FailSafe);
        self.window.reset();
        warn!(from = %from, cause = ?cause, "entering fail-safe stop");
        self.decision(Some(Transition {
            from,
            to: NavMode::FailSafe,
            cause,
        }))
    }

    /// Operator pause.  Suspends hazard-driven transitions; idempotent.
    pub fn pause(&mut self) -> Decision {
        if matches!(self.mode, NavMode::Paused | NavMode::Stopped) {
            return self.current();
        }
        self.operator_transition(NavMode::Paused)
    }

    /// Operator resume: back to `Advancing` with fresh history.  No-op
    /// unless paused.
    pub fn resume(&mut self) -> Decision {
        if self.mode != NavMode::Paused {
            return self.current();
        }
        let decision = self.operator_transition(NavMode::Advancing);
        self.reset_to_advancing();
        decision
    }

    /// Operator shutdown.  Terminal and idempotent.
    pub fn shutdown(&mut self) -> Decision {
        if self.mode == NavMode::Stopped {
            return self.current();
        }
        self.operator_transition(NavMode::Stopped)
    }

    fn operator_transition(&mut self, to: NavMode) -> Decision {
        let from = self.mode;
        self.enter(to);
        info!(from = %from, to = %to, "navigation mode changed by operator");
        self.decision(Some(Transition {
            from,
            to,
            cause: TransitionCause::Operator,
        }))
    }

    fn enter(&mut self, mode: NavMode) {
        self.mode = mode;
        if mode != NavMode::Rotating {
            self.rotation_cycles = 0;
        }
    }

    fn reset_to_advancing(&mut self) {
        self.mode = NavMode::Advancing;
        self.window.reset();
        self.rotation_cycles = 0;
        self.not_ready_streak = 0;
    }

    fn decision(&self, transition: Option<Transition>) -> Decision {
        Decision {
            mode: self.mode,
            command: self.current_command(),
            transition,
            stuck: self.is_stuck(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexnav_perception::classifier::classify_readings;

    fn policy_with(k: usize) -> NavigationPolicy {
        NavigationPolicy::new(Arc::new(NavConfig {
            hysteresis_window: k,
            stuck_rotation_cycles: 3,
            source_exhaustion_cycles: 3,
            ..NavConfig::default()
        }))
    }

    fn reading(l: Option<f32>, c: Option<f32>, r: Option<f32>) -> DangerAssessment {
        classify_readings([l, c, r], &NavConfig::default())
    }

    fn ok() -> DangerAssessment {
        reading(None, None, None)
    }

    fn stop() -> DangerAssessment {
        reading(None, Some(0.92), None)
    }

    fn obs_left() -> DangerAssessment {
        reading(Some(0.47), None, None)
    }

    fn obs_right() -> DangerAssessment {
        reading(None, None, Some(0.47))
    }

    fn warn_center() -> DangerAssessment {
        reading(None, Some(0.55), None)
    }

    #[test]
    fn starts_advancing() {
        let p = policy_with(2);
        assert_eq!(p.mode(), NavMode::Advancing);
        assert_eq!(p.current_command(), MotionCommand::new(Action::Advance));
    }

    #[test]
    fn escalation_needs_k_agreeing_readings() {
        let mut p = policy_with(2);
        let d = p.decide(&obs_left());
        assert_eq!(d.command.action, Action::Advance);
        assert!(d.transition.is_none());

        let d = p.decide(&obs_left());
        assert_eq!(d.command.action, Action::TranslateRight);
        assert_eq!(
            d.transition,
            Some(Transition {
                from: NavMode::Advancing,
                to: NavMode::TranslatingRight,
                cause: TransitionCause::Hazard
            })
        );

        // Staying in the mode does not re-emit.
        let d = p.decide(&obs_left());
        assert!(d.transition.is_none());
        assert_eq!(d.command.action, Action::TranslateRight);
    }

    #[test]
    fn single_spurious_stop_is_ignored() {
        let mut p = policy_with(2);
        for a in [ok(), stop(), ok()] {
            let d = p.decide(&a);
            assert_eq!(d.mode, NavMode::Advancing);
            assert!(d.transition.is_none());
        }
    }

    #[test]
    fn de_escalation_is_immediate() {
        let mut p = policy_with(2);
        p.decide(&stop());
        p.decide(&stop());
        assert_eq!(p.mode(), NavMode::Rotating);
        let d = p.decide(&ok());
        assert_eq!(d.mode, NavMode::Advancing);
        assert_eq!(d.command.action, Action::Advance);
        assert!(d.transition.is_some());
    }

    #[test]
    fn lateral_switch_needs_agreement() {
        let mut p = policy_with(2);
        p.decide(&obs_left());
        p.decide(&obs_left());
        assert_eq!(p.mode(), NavMode::TranslatingRight);
        assert_eq!(p.decide(&obs_right()).mode, NavMode::TranslatingRight);
        assert_eq!(p.decide(&obs_right()).mode, NavMode::TranslatingLeft);
    }

    #[test]
    fn warn_maps_to_circumventing() {
        let mut p = policy_with(1);
        assert_eq!(p.decide(&warn_center()).command.action, Action::Circumvent);
        let both = reading(Some(0.5), None, Some(0.5));
        assert_eq!(p.decide(&both).mode, NavMode::Circumventing);
    }

    #[test]
    fn window_of_one_reacts_immediately() {
        let mut p = policy_with(1);
        assert_eq!(p.decide(&stop()).mode, NavMode::Rotating);
    }

    #[test]
    fn rotation_turns_towards_the_clear_side() {
        let mut p = policy_with(1);
        let d = p.decide(&reading(Some(0.7), Some(0.9), Some(0.1)));
        assert_eq!(d.command, MotionCommand::rotate(Side::Right));
        // Neither side clear: keep the previous choice.
        let d = p.decide(&reading(Some(0.7), Some(0.9), Some(0.7)));
        assert_eq!(d.command, MotionCommand::rotate(Side::Right));
    }

    #[test]
    fn rotation_defaults_to_left() {
        let mut p = policy_with(1);
        assert_eq!(p.decide(&stop()).command, MotionCommand::rotate(Side::Left));
    }

    #[test]
    fn prolonged_rotation_is_flagged_stuck() {
        let mut p = policy_with(1);
        let flags: Vec<bool> = (0..5).map(|_| p.decide(&stop()).stuck).collect();
        assert_eq!(flags, vec![false, false, false, true, true]);
        assert_eq!(p.mode(), NavMode::Rotating);
        // Clearing ends the condition.
        assert!(!p.decide(&ok()).stuck);
    }

    #[test]
    fn pause_suspends_and_resume_restarts_fresh() {
        let mut p = policy_with(2);
        p.decide(&stop());
        let d = p.pause();
        assert_eq!(d.command.action, Action::Paused);
        assert!(d.transition.is_some());
        // Idempotent.
        assert!(p.pause().transition.is_none());
        // Hazards are ignored while paused.
        assert_eq!(p.decide(&stop()).mode, NavMode::Paused);

        let d = p.resume();
        assert_eq!(d.command.action, Action::Advance);
        assert_eq!(d.transition.map(|t| t.cause), Some(TransitionCause::Operator));
        // History was cleared: one STOP reading is not enough.
        assert_eq!(p.decide(&stop()).mode, NavMode::Advancing);
        assert!(p.resume().transition.is_none());
    }

    #[test]
    fn shutdown_is_terminal_and_idempotent() {
        let mut p = policy_with(1);
        let d = p.shutdown();
        assert_eq!(d.command.action, Action::Stop);
        assert_eq!(d.mode, NavMode::Stopped);
        assert!(p.shutdown().transition.is_none());
        assert_eq!(p.decide(&ok()).mode, NavMode::Stopped);
        assert_eq!(p.resume().mode, NavMode::Stopped);
        assert_eq!(p.pause().mode, NavMode::Stopped);
    }

    #[test]
    fn source_exhaustion_fails_safe_then_recovers() {
        let mut p = policy_with(2);
        assert!(p.source_not_ready().transition.is_none());
        assert!(p.source_not_ready().transition.is_none());
        let d = p.source_not_ready();
        assert_eq!(d.mode, NavMode::FailSafe);
        assert_eq!(d.command.action, Action::Stop);
        assert_eq!(d.transition.map(|t| t.cause), Some(TransitionCause::SourceExhausted));
        // Further misses hold without re-emitting.
        assert!(p.source_not_ready().transition.is_none());

        let d = p.decide(&ok());
        assert_eq!(d.mode, NavMode::Advancing);
        assert_eq!(
            d.transition,
            Some(Transition {
                from: NavMode::FailSafe,
                to: NavMode::Advancing,
                cause: TransitionCause::SourceRecovered
            })
        );
    }

    #[test]
    fn recovery_follows_the_fresh_reading() {
        let mut p = policy_with(2);
        for _ in 0..3 {
            p.source_not_ready();
        }
        assert_eq!(p.mode(), NavMode::FailSafe);

        // A hazard on the first frame back must not release the robot.
        let d = p.decide(&stop());
        assert_eq!(d.mode, NavMode::Rotating);
        assert_eq!(d.command, MotionCommand::rotate(Side::Left));
        assert_eq!(
            d.transition,
            Some(Transition {
                from: NavMode::FailSafe,
                to: NavMode::Rotating,
                cause: TransitionCause::SourceRecovered
            })
        );
        assert_eq!(p.decide(&stop()).mode, NavMode::Rotating);
        assert_eq!(p.decide(&ok()).mode, NavMode::Advancing);
    }

    #[test]
    fn recovery_into_lateral_translation() {
        let mut p = policy_with(3);
        p.fail_safe(TransitionCause::FramesRejected);
        assert_eq!(p.decide(&obs_left()).command.action, Action::TranslateRight);
    }

    #[test]
    fn fail_safe_is_idempotent_and_yields_to_operator() {
        let mut p = policy_with(2);
        let d = p.fail_safe(TransitionCause::FramesRejected);
        assert_eq!(d.command.action, Action::Stop);
        assert_eq!(d.transition.map(|t| t.cause), Some(TransitionCause::FramesRejected));
        assert!(p.fail_safe(TransitionCause::FramesRejected).transition.is_none());
        assert!(p.source_not_ready().transition.is_none());

        p.pause();
        assert!(p.fail_safe(TransitionCause::SourceExhausted).transition.is_none());
        assert_eq!(p.mode(), NavMode::Paused);
    }

    #[test]
    fn fresh_frame_resets_the_miss_streak() {
        let mut p = policy_with(2);
        p.source_not_ready();
        p.source_not_ready();
        p.decide(&ok());
        assert_eq!(p.not_ready_streak(), 0);
        assert_eq!(p.source_not_ready().mode, NavMode::Advancing);
    }

    #[test]
    fn current_is_idempotent() {
        let mut p = policy_with(1);
        p.decide(&warn_center());
        assert_eq!(p.current(), p.current());
        assert!(p.current().transition.is_none());
        assert_eq!(p.mode(), NavMode::Circumventing);
    }
}
