use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::fusion::AttentionState;
use crate::models::{
    Achievement, DetectionCounts, SessionAnalytics, SessionStats, SessionSummary,
};

use super::config::ScoringConfig;
use super::streaks::StreakTracker;

/// Monotone per-session tallies. The three time buckets always sum to the
/// elapsed session time, up to per-tick rounding.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAccumulator {
    pub focused_secs: f64,
    pub distracted_secs: f64,
    pub away_secs: f64,
    pub object_hits: u32,
    pub transition_events: u32,
}

impl ScoreAccumulator {
    pub fn total_secs(&self) -> f64 {
        self.focused_secs + self.distracted_secs + self.away_secs
    }
}

/// Append-only record of one recorded tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub state: AttentionState,
    pub duration_secs: f64,
}

/// One minute of the session, bucketed per state for timeline charts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBucket {
    pub timestamp: DateTime<Utc>,
    pub focused: f64,
    pub distracted: f64,
    pub away: f64,
}

const TIMELINE_BUCKET_SECS: i64 = 60;

/// Accumulates the state machine's per-tick output into the bounded 0-100
/// focus score, the session history, and achievement triggers.
///
/// Owned exclusively by the active session; reset at session start and
/// discarded once its final summary is handed to persistence.
pub struct FocusScoreEngine {
    config: ScoringConfig,
    accumulator: ScoreAccumulator,
    history: Vec<SessionHistoryEntry>,
    streaks: StreakTracker,
    started_at: Option<DateTime<Utc>>,
}

impl FocusScoreEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            accumulator: ScoreAccumulator::default(),
            history: Vec::new(),
            streaks: StreakTracker::new(),
            started_at: None,
        }
    }

    /// Resets all accumulators and the history log for a fresh session.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.accumulator = ScoreAccumulator::default();
        self.history.clear();
        self.streaks = StreakTracker::new();
        self.started_at = Some(now);
    }

    /// Adds one tick's duration to the bucket matching its state and appends
    /// it to the history log.
    pub fn record_tick(&mut self, state: AttentionState, tick_secs: f64, now: DateTime<Utc>) {
        let tick_secs = if tick_secs.is_finite() && tick_secs > 0.0 {
            tick_secs
        } else {
            0.0
        };

        match state {
            AttentionState::Focused => self.accumulator.focused_secs += tick_secs,
            AttentionState::Distracted => self.accumulator.distracted_secs += tick_secs,
            AttentionState::Away => self.accumulator.away_secs += tick_secs,
        }

        self.history.push(SessionHistoryEntry {
            timestamp: now,
            state,
            duration_secs: tick_secs,
        });
    }

    /// Records one discrete object-distraction hit (a critical-tier
    /// stabilization newly appearing).
    pub fn record_object_hit(&mut self) {
        self.accumulator.object_hits += 1;
    }

    /// Records one transition away from focus, as reported by the state
    /// machine.
    pub fn record_focus_break(&mut self) {
        self.accumulator.transition_events += 1;
    }

    /// The bounded focus score. Pure over the accumulator: repeated calls
    /// without an intervening tick return the same value, and an empty
    /// session yields the configured baseline rather than NaN.
    pub fn score(&self) -> u8 {
        let acc = &self.accumulator;
        let total = acc.total_secs();
        if total <= 0.0 {
            return self.config.empty_score;
        }

        let effective = total
            + acc.distracted_secs * self.config.distracted_weight
            + acc.away_secs * self.config.away_weight;
        let raw = 100.0 * acc.focused_secs / effective;

        let hit_penalty = (f64::from(acc.object_hits) * self.config.hit_penalty)
            .min(self.config.hit_penalty_cap);
        let event_penalty = (f64::from(acc.transition_events) * self.config.event_penalty)
            .min(self.config.event_penalty_cap);

        (raw - hit_penalty - event_penalty).clamp(0.0, 100.0).round() as u8
    }

    /// Achievements newly satisfied by the current history and accumulator.
    /// Each satisfying window reports once; re-polling every tick does not
    /// re-emit.
    pub fn check_streaks(&mut self) -> Vec<Achievement> {
        self.streaks
            .check(&self.history, &self.accumulator, &self.config)
    }

    pub fn accumulator(&self) -> &ScoreAccumulator {
        &self.accumulator
    }

    pub fn history(&self) -> &[SessionHistoryEntry] {
        &self.history
    }

    pub fn stats(&self) -> SessionStats {
        let acc = &self.accumulator;
        let total = acc.total_secs();
        let pct = |part: f64| -> u8 {
            if total > 0.0 {
                (100.0 * part / total).round() as u8
            } else {
                0
            }
        };

        SessionStats {
            score: self.score(),
            focused_secs: acc.focused_secs.round() as u64,
            distracted_secs: acc.distracted_secs.round() as u64,
            away_secs: acc.away_secs.round() as u64,
            phone_detections: acc.object_hits,
            distraction_events: acc.transition_events,
            total_secs: total.round() as u64,
            focused_percentage: pct(acc.focused_secs),
            distracted_percentage: pct(acc.distracted_secs),
            away_percentage: pct(acc.away_secs),
        }
    }

    /// Collapses the history log into one-minute buckets for charting.
    pub fn timeline(&self) -> Vec<TimelineBucket> {
        let Some(start) = self.started_at else {
            return Vec::new();
        };

        let mut buckets: Vec<TimelineBucket> = Vec::new();
        let mut current = TimelineBucket {
            timestamp: start,
            ..TimelineBucket::default()
        };
        let mut bucket_start = start;

        for entry in &self.history {
            if (entry.timestamp - bucket_start).num_seconds() >= TIMELINE_BUCKET_SECS {
                buckets.push(current);
                bucket_start = entry.timestamp;
                current = TimelineBucket {
                    timestamp: bucket_start,
                    ..TimelineBucket::default()
                };
            }
            match entry.state {
                AttentionState::Focused => current.focused += entry.duration_secs,
                AttentionState::Distracted => current.distracted += entry.duration_secs,
                AttentionState::Away => current.away += entry.duration_secs,
            }
        }

        if current.focused + current.distracted + current.away > 0.0 {
            buckets.push(current);
        }
        buckets
    }

    /// The immutable final record for the persistence collaborator.
    pub fn finalize(&self, session_id: &str, subject: &str) -> SessionSummary {
        let acc = &self.accumulator;
        let score = self.score();

        let detections = DetectionCounts {
            phone: acc.object_hits,
            distracted: acc.distracted_secs.round() as u64,
            focused: acc.focused_secs.round() as u64,
            away: acc.away_secs.round() as u64,
        };

        SessionSummary {
            session_id: session_id.to_string(),
            subject: subject.to_string(),
            duration_minutes: (acc.total_secs() / 60.0).round() as u32,
            focus_score: score,
            detections,
            analytics: self.analytics(score),
        }
    }

    fn analytics(&self, score: u8) -> SessionAnalytics {
        let mut focused_by_hour = [0.0_f64; 24];
        let mut total_by_hour = [0.0_f64; 24];
        for entry in &self.history {
            let hour = entry.timestamp.hour() as usize;
            total_by_hour[hour] += entry.duration_secs;
            if entry.state == AttentionState::Focused {
                focused_by_hour[hour] += entry.duration_secs;
            }
        }

        let mut hourly_focus = [0.0_f64; 24];
        for hour in 0..24 {
            if total_by_hour[hour] > 0.0 {
                hourly_focus[hour] = 100.0 * focused_by_hour[hour] / total_by_hour[hour];
            }
        }

        SessionAnalytics {
            hourly_focus,
            recovery_rate: if score > 70 { 0.85 } else { 0.65 },
            distraction_resistance: (100.0 - f64::from(self.accumulator.object_hits) * 5.0)
                .max(0.0),
        }
    }
}
