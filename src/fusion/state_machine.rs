use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::FusionConfig;
use super::smoother::SmoothedSignal;
use super::stabilizer::StabilizedDistraction;
use super::taxonomy::PriorityTier;

/// The debounced attention classification. Exactly one value at all times;
/// absence of signal is handled explicitly, never left unknown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AttentionState {
    Focused,
    Distracted,
    Away,
}

impl Default for AttentionState {
    fn default() -> Self {
        AttentionState::Focused
    }
}

impl AttentionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionState::Focused => "focused",
            AttentionState::Distracted => "distracted",
            AttentionState::Away => "away",
        }
    }
}

/// Why the machine left `Focused` this tick, for display purposes only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DistractionCause {
    FaceAbsent,
    EyesClosed,
    HeadTurned { mean_yaw: f32, mean_pitch: f32 },
    GazeAway { mean_away_score: f32 },
    Object { label: String, tier: PriorityTier },
}

/// One tick's worth of fused inputs.
#[derive(Debug, Clone)]
pub struct TickInput<'a> {
    pub face_detected: bool,
    pub stabilized: Option<&'a StabilizedDistraction>,
    pub smoothed: SmoothedSignal,
    pub tick_duration: Duration,
}

#[derive(Debug, Clone)]
pub struct StateOutcome {
    pub state: AttentionState,
    /// True exactly when this tick moved the machine out of `Focused`.
    pub left_focus: bool,
    pub cause: Option<DistractionCause>,
}

/// Combines the stabilized object signal, smoothed pose/gaze signals, and
/// face-presence timing into one attention state per tick.
///
/// The machine is a pure function of (inputs, previous state, accumulated
/// absence duration); it never reads the wall clock. Rules run in strict
/// priority order: sustained face absence, then eyes closed, then head or
/// gaze away, then a stabilized object, otherwise focused.
pub struct AttentionStateMachine {
    config: FusionConfig,
    state: AttentionState,
    absent_for: Duration,
    transition_events: u32,
}

impl AttentionStateMachine {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            state: AttentionState::Focused,
            absent_for: Duration::ZERO,
            transition_events: 0,
        }
    }

    pub fn state(&self) -> AttentionState {
        self.state
    }

    /// Count of transitions away from `Focused` since the last reset.
    pub fn transition_events(&self) -> u32 {
        self.transition_events
    }

    pub fn tick(&mut self, input: &TickInput<'_>) -> StateOutcome {
        // Presence timing updates on every tick, regardless of the resulting
        // state, so the absence timer always measures true time without a face.
        if input.face_detected {
            self.absent_for = Duration::ZERO;
        } else {
            self.absent_for += input.tick_duration;
        }

        let (next, cause) = self.classify(input);

        let left_focus = self.state == AttentionState::Focused && next != AttentionState::Focused;
        if left_focus {
            self.transition_events += 1;
        }
        self.state = next;

        StateOutcome {
            state: next,
            left_focus,
            cause,
        }
    }

    fn classify(&self, input: &TickInput<'_>) -> (AttentionState, Option<DistractionCause>) {
        let smoothed = &input.smoothed;

        if !input.face_detected && self.absent_for > self.config.absence_timeout {
            return (AttentionState::Away, Some(DistractionCause::FaceAbsent));
        }

        if smoothed.gaze_samples > 0
            && smoothed.mean_closed_score > self.config.eyes_closed_limit
        {
            return (AttentionState::Away, Some(DistractionCause::EyesClosed));
        }

        if smoothed.pose_samples > 0
            && (smoothed.mean_yaw.abs() > self.config.head_angle_limit
                || smoothed.mean_pitch.abs() > self.config.head_angle_limit)
        {
            return (
                AttentionState::Distracted,
                Some(DistractionCause::HeadTurned {
                    mean_yaw: smoothed.mean_yaw,
                    mean_pitch: smoothed.mean_pitch,
                }),
            );
        }

        if smoothed.gaze_samples > 0 && smoothed.mean_away_score > self.config.gaze_away_limit {
            return (
                AttentionState::Distracted,
                Some(DistractionCause::GazeAway {
                    mean_away_score: smoothed.mean_away_score,
                }),
            );
        }

        if let Some(distraction) = input.stabilized {
            // Tier and severity are forwarded for display; they do not affect
            // state selection once any distraction has been stabilized.
            return (
                AttentionState::Distracted,
                Some(DistractionCause::Object {
                    label: distraction.label.clone(),
                    tier: distraction.tier,
                }),
            );
        }

        (AttentionState::Focused, None)
    }

    pub fn reset(&mut self) {
        self.state = AttentionState::Focused;
        self.absent_for = Duration::ZERO;
        self.transition_events = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::stabilizer::BoundingBox;

    fn machine() -> AttentionStateMachine {
        AttentionStateMachine::new(FusionConfig::default())
    }

    fn input(face: bool, smoothed: SmoothedSignal) -> TickInput<'static> {
        TickInput {
            face_detected: face,
            stabilized: None,
            smoothed,
            tick_duration: Duration::from_secs(1),
        }
    }

    fn present_signal() -> SmoothedSignal {
        SmoothedSignal {
            pose_samples: 5,
            gaze_samples: 5,
            ..SmoothedSignal::default()
        }
    }

    fn phone() -> StabilizedDistraction {
        StabilizedDistraction {
            label: "cell phone".into(),
            tier: PriorityTier::Critical,
            severity: 1.0,
            confidence: 0.8,
            bounding_box: BoundingBox::default(),
            consistency_count: 2,
        }
    }

    #[test]
    fn starts_focused() {
        assert_eq!(machine().state(), AttentionState::Focused);
    }

    #[test]
    fn stays_focused_with_clean_signals() {
        let mut m = machine();
        let outcome = m.tick(&input(true, present_signal()));
        assert_eq!(outcome.state, AttentionState::Focused);
        assert!(!outcome.left_focus);
    }

    #[test]
    fn absence_declares_away_only_after_timeout_is_exceeded() {
        let mut m = machine();
        // 2 s timeout, 1 s ticks: 1 s and 2 s absent are not yet beyond it.
        assert_eq!(m.tick(&input(false, SmoothedSignal::default())).state, AttentionState::Focused);
        assert_eq!(m.tick(&input(false, SmoothedSignal::default())).state, AttentionState::Focused);
        let outcome = m.tick(&input(false, SmoothedSignal::default()));
        assert_eq!(outcome.state, AttentionState::Away);
        assert_eq!(outcome.cause, Some(DistractionCause::FaceAbsent));
    }

    #[test]
    fn face_reappearing_resets_the_absence_timer() {
        let mut m = machine();
        m.tick(&input(false, SmoothedSignal::default()));
        m.tick(&input(false, SmoothedSignal::default()));
        m.tick(&input(true, present_signal()));
        // Timer restarted; two more absent ticks are still within the timeout.
        m.tick(&input(false, SmoothedSignal::default()));
        let outcome = m.tick(&input(false, SmoothedSignal::default()));
        assert_eq!(outcome.state, AttentionState::Focused);
    }

    #[test]
    fn eyes_closed_outranks_head_away() {
        let mut m = machine();
        let smoothed = SmoothedSignal {
            mean_yaw: 40.0,
            mean_closed_score: 0.8,
            pose_samples: 5,
            gaze_samples: 5,
            ..SmoothedSignal::default()
        };
        let outcome = m.tick(&input(true, smoothed));
        assert_eq!(outcome.state, AttentionState::Away);
        assert_eq!(outcome.cause, Some(DistractionCause::EyesClosed));
    }

    #[test]
    fn head_away_yields_distracted() {
        let mut m = machine();
        let smoothed = SmoothedSignal {
            mean_pitch: -30.0,
            pose_samples: 5,
            gaze_samples: 5,
            ..SmoothedSignal::default()
        };
        let outcome = m.tick(&input(true, smoothed));
        assert_eq!(outcome.state, AttentionState::Distracted);
    }

    #[test]
    fn gaze_away_yields_distracted() {
        let mut m = machine();
        let smoothed = SmoothedSignal {
            mean_away_score: 0.5,
            pose_samples: 5,
            gaze_samples: 5,
            ..SmoothedSignal::default()
        };
        let outcome = m.tick(&input(true, smoothed));
        assert_eq!(outcome.state, AttentionState::Distracted);
        assert_eq!(
            outcome.cause,
            Some(DistractionCause::GazeAway {
                mean_away_score: 0.5
            })
        );
    }

    #[test]
    fn stabilized_object_yields_distracted_when_face_signals_are_clean() {
        let mut m = machine();
        let distraction = phone();
        let tick = TickInput {
            face_detected: true,
            stabilized: Some(&distraction),
            smoothed: present_signal(),
            tick_duration: Duration::from_secs(1),
        };
        let outcome = m.tick(&tick);
        assert_eq!(outcome.state, AttentionState::Distracted);
        assert!(outcome.left_focus);
        assert_eq!(m.transition_events(), 1);
    }

    #[test]
    fn sustained_absence_overrides_a_stabilized_object() {
        let mut m = machine();
        let distraction = phone();
        for _ in 0..4 {
            let tick = TickInput {
                face_detected: false,
                stabilized: Some(&distraction),
                smoothed: SmoothedSignal::default(),
                tick_duration: Duration::from_secs(1),
            };
            m.tick(&tick);
        }
        assert_eq!(m.state(), AttentionState::Away);
    }

    #[test]
    fn returning_to_focus_does_not_count_a_transition_event() {
        let mut m = machine();
        let smoothed = SmoothedSignal {
            mean_yaw: 40.0,
            pose_samples: 5,
            ..SmoothedSignal::default()
        };
        m.tick(&input(true, smoothed));
        m.tick(&input(true, present_signal()));
        assert_eq!(m.transition_events(), 1);
    }

    #[test]
    fn no_signal_at_all_degrades_to_away_and_stays_there() {
        let mut m = machine();
        for _ in 0..10 {
            m.tick(&input(false, SmoothedSignal::default()));
        }
        assert_eq!(m.state(), AttentionState::Away);
    }
}
