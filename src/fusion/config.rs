use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Tunable thresholds for the fusion pipeline.
///
/// Invalid values are rejected up front; the per-tick path never has to
/// re-validate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FusionConfig {
    /// Minimum model confidence for a raw detection to enter the stabilizer.
    pub acceptance_threshold: f32,
    /// Rolling detection buffer length (ticks).
    pub detection_buffer_len: usize,
    /// How many buffer entries must agree before a distraction is real.
    pub min_consistency: usize,
    /// Pose/gaze ring buffer length (ticks).
    pub smoothing_window: usize,
    /// Mean |yaw| or |pitch| beyond this counts as head-away.
    pub head_angle_limit: f32,
    /// Mean eye-closure score beyond this counts as eyes-closed.
    pub eyes_closed_limit: f32,
    /// Mean gaze-offset score beyond this counts as gaze-away.
    pub gaze_away_limit: f32,
    /// Sustained face absence beyond this declares the user away.
    #[serde(with = "duration_secs")]
    pub absence_timeout: Duration,
    /// Run the object model every Nth tick to bound cost.
    pub object_tick_cadence: u32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.3,
            detection_buffer_len: 5,
            min_consistency: 2,
            smoothing_window: 10,
            head_angle_limit: 25.0,
            eyes_closed_limit: 0.6,
            gaze_away_limit: 0.3,
            absence_timeout: Duration::from_secs(2),
            object_tick_cadence: 2,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            bail!(
                "acceptance_threshold {} is outside [0,1]",
                self.acceptance_threshold
            );
        }
        if self.detection_buffer_len == 0 {
            bail!("detection_buffer_len must be at least 1");
        }
        if self.min_consistency == 0 || self.min_consistency > self.detection_buffer_len {
            bail!(
                "min_consistency {} must be in 1..={}",
                self.min_consistency,
                self.detection_buffer_len
            );
        }
        if self.smoothing_window == 0 {
            bail!("smoothing_window must be at least 1");
        }
        if !self.head_angle_limit.is_finite() || self.head_angle_limit <= 0.0 {
            bail!("head_angle_limit {} must be positive", self.head_angle_limit);
        }
        for (name, value) in [
            ("eyes_closed_limit", self.eyes_closed_limit),
            ("gaze_away_limit", self.gaze_away_limit),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} {value} is outside [0,1]");
            }
        }
        if self.absence_timeout.is_zero() {
            bail!("absence_timeout must be non-zero");
        }
        if self.object_tick_cadence == 0 {
            bail!("object_tick_cadence must be at least 1");
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "invalid duration seconds: {secs}"
            )));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        FusionConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_buffer_capacity_is_rejected() {
        let config = FusionConfig {
            detection_buffer_len: 0,
            ..FusionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn consistency_larger_than_buffer_is_rejected() {
        let config = FusionConfig {
            detection_buffer_len: 3,
            min_consistency: 4,
            ..FusionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = FusionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: FusionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.absence_timeout, config.absence_timeout);
        assert_eq!(parsed.smoothing_window, config.smoothing_window);
    }
}
