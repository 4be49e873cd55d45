use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Scoring constants. These are configuration rather than hard-coded values
/// so the penalty profile can be tuned without touching the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    /// Weight applied to distracted seconds when inflating effective time.
    pub distracted_weight: f64,
    /// Weight applied to away seconds when inflating effective time.
    pub away_weight: f64,
    /// Points deducted per object-distraction hit.
    pub hit_penalty: f64,
    /// Ceiling on total hit penalties.
    pub hit_penalty_cap: f64,
    /// Points deducted per transition away from focus.
    pub event_penalty: f64,
    /// Ceiling on total transition penalties.
    pub event_penalty_cap: f64,
    /// Score reported before any time has been recorded.
    pub empty_score: u8,
    /// Trailing history entries that must all be focused for a streak.
    pub streak_window: usize,
    /// Focused seconds required for the distraction-free achievement.
    pub distraction_free_secs: f64,
}

impl Default for ScoringConfig {
    /// The aggressive profile: a session cannot reach 100 after any recorded
    /// distraction.
    fn default() -> Self {
        Self {
            distracted_weight: 2.0,
            away_weight: 3.0,
            hit_penalty: 15.0,
            hit_penalty_cap: 50.0,
            event_penalty: 5.0,
            event_penalty_cap: 30.0,
            empty_score: 0,
            streak_window: 15,
            distraction_free_secs: 1800.0,
        }
    }
}

impl ScoringConfig {
    /// The gentler legacy profile: lighter time weights, a flat per-hit
    /// penalty, no transition penalty, and a 100 baseline for an empty
    /// session.
    pub fn lenient() -> Self {
        Self {
            distracted_weight: 1.5,
            away_weight: 2.0,
            hit_penalty: 5.0,
            hit_penalty_cap: 100.0,
            event_penalty: 0.0,
            event_penalty_cap: 0.0,
            empty_score: 100,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("distracted_weight", self.distracted_weight),
            ("away_weight", self.away_weight),
            ("hit_penalty", self.hit_penalty),
            ("hit_penalty_cap", self.hit_penalty_cap),
            ("event_penalty", self.event_penalty),
            ("event_penalty_cap", self.event_penalty_cap),
            ("distraction_free_secs", self.distraction_free_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} {value} must be finite and non-negative");
            }
        }
        if self.empty_score > 100 {
            bail!("empty_score {} exceeds 100", self.empty_score);
        }
        if self.streak_window == 0 {
            bail!("streak_window must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_profiles_validate() {
        ScoringConfig::default().validate().unwrap();
        ScoringConfig::lenient().validate().unwrap();
    }

    #[test]
    fn negative_weight_is_rejected() {
        let config = ScoringConfig {
            away_weight: -1.0,
            ..ScoringConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
