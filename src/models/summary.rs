use serde::{Deserialize, Serialize};

/// Per-state tallies handed to persistence. `phone` counts discrete
/// critical-tier object hits; the rest are whole seconds in each state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionCounts {
    pub phone: u32,
    pub distracted: u64,
    pub focused: u64,
    pub away: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    /// Focused percentage per UTC hour of day.
    pub hourly_focus: [f64; 24],
    pub recovery_rate: f64,
    pub distraction_resistance: f64,
}

impl Default for SessionAnalytics {
    fn default() -> Self {
        Self {
            hourly_focus: [0.0; 24],
            recovery_rate: 0.0,
            distraction_resistance: 0.0,
        }
    }
}

/// The finalized, immutable record handed to the persistence collaborator at
/// session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub subject: String,
    pub duration_minutes: u32,
    pub focus_score: u8,
    pub detections: DetectionCounts,
    pub analytics: SessionAnalytics,
}

/// Live per-tick view of the accumulator, for display while a session runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub score: u8,
    pub focused_secs: u64,
    pub distracted_secs: u64,
    pub away_secs: u64,
    pub phone_detections: u32,
    pub distraction_events: u32,
    pub total_secs: u64,
    pub focused_percentage: u8,
    pub distracted_percentage: u8,
    pub away_percentage: u8,
}
