use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AchievementKind {
    DeepWorkStreak,
    DistractionFree,
}

/// A one-shot recognition surfaced to the achievement consumer. Delivery is
/// the caller's concern; the engine only guarantees each satisfying window
/// produces one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
}

impl Achievement {
    pub fn deep_work_streak() -> Self {
        Self {
            kind: AchievementKind::DeepWorkStreak,
            title: "Deep Work Streak!".to_string(),
            description: "You're in the zone!".to_string(),
        }
    }

    pub fn distraction_free() -> Self {
        Self {
            kind: AchievementKind::DistractionFree,
            title: "Distraction-Free Session".to_string(),
            description: "Great digital discipline!".to_string(),
        }
    }
}
