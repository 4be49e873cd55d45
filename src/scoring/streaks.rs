use crate::fusion::AttentionState;
use crate::models::Achievement;

use super::config::ScoringConfig;
use super::engine::{ScoreAccumulator, SessionHistoryEntry};

/// Tracks which achievement windows have already been reported so re-polling
/// every tick does not re-emit them.
pub struct StreakTracker {
    deep_work_armed: bool,
    distraction_free_emitted: bool,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self {
            deep_work_armed: true,
            distraction_free_emitted: false,
        }
    }

    pub fn check(
        &mut self,
        history: &[SessionHistoryEntry],
        accumulator: &ScoreAccumulator,
        config: &ScoringConfig,
    ) -> Vec<Achievement> {
        let mut achievements = Vec::new();

        let window = config.streak_window;
        let streak_holds = history.len() >= window
            && history[history.len() - window..]
                .iter()
                .all(|entry| entry.state == AttentionState::Focused);

        if streak_holds {
            if self.deep_work_armed {
                self.deep_work_armed = false;
                achievements.push(Achievement::deep_work_streak());
            }
        } else {
            // The window broke; the next full streak counts as a new one.
            self.deep_work_armed = true;
        }

        if !self.distraction_free_emitted
            && accumulator.object_hits == 0
            && accumulator.focused_secs > config.distraction_free_secs
        {
            self.distraction_free_emitted = true;
            achievements.push(Achievement::distraction_free());
        }

        achievements
    }
}

impl Default for StreakTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AchievementKind;
    use chrono::Utc;

    fn entry(state: AttentionState) -> SessionHistoryEntry {
        SessionHistoryEntry {
            timestamp: Utc::now(),
            state,
            duration_secs: 1.0,
        }
    }

    fn focused_run(len: usize) -> Vec<SessionHistoryEntry> {
        (0..len).map(|_| entry(AttentionState::Focused)).collect()
    }

    #[test]
    fn deep_work_requires_a_full_window() {
        let mut tracker = StreakTracker::new();
        let config = ScoringConfig::default();
        let acc = ScoreAccumulator::default();
        assert!(tracker.check(&focused_run(14), &acc, &config).is_empty());
        let hits = tracker.check(&focused_run(15), &acc, &config);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, AchievementKind::DeepWorkStreak);
    }

    #[test]
    fn deep_work_is_not_re_emitted_while_the_streak_continues() {
        let mut tracker = StreakTracker::new();
        let config = ScoringConfig::default();
        let acc = ScoreAccumulator::default();
        assert_eq!(tracker.check(&focused_run(15), &acc, &config).len(), 1);
        assert!(tracker.check(&focused_run(16), &acc, &config).is_empty());
        assert!(tracker.check(&focused_run(40), &acc, &config).is_empty());
    }

    #[test]
    fn deep_work_re_arms_after_the_window_breaks() {
        let mut tracker = StreakTracker::new();
        let config = ScoringConfig::default();
        let acc = ScoreAccumulator::default();
        let mut history = focused_run(15);
        assert_eq!(tracker.check(&history, &acc, &config).len(), 1);

        history.push(entry(AttentionState::Distracted));
        assert!(tracker.check(&history, &acc, &config).is_empty());

        history.extend(focused_run(15));
        assert_eq!(tracker.check(&history, &acc, &config).len(), 1);
    }

    #[test]
    fn distraction_free_fires_once_per_session() {
        let mut tracker = StreakTracker::new();
        let config = ScoringConfig::default();
        let acc = ScoreAccumulator {
            focused_secs: 1801.0,
            ..ScoreAccumulator::default()
        };
        let hits = tracker.check(&[], &acc, &config);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, AchievementKind::DistractionFree);
        assert!(tracker.check(&[], &acc, &config).is_empty());
    }

    #[test]
    fn object_hits_block_distraction_free() {
        let mut tracker = StreakTracker::new();
        let config = ScoringConfig::default();
        let acc = ScoreAccumulator {
            focused_secs: 5000.0,
            object_hits: 1,
            ..ScoreAccumulator::default()
        };
        assert!(tracker.check(&[], &acc, &config).is_empty());
    }
}
