use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::landmarks::{GazeSample, PoseSample};

/// Running averages over the current pose/gaze windows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedSignal {
    pub mean_yaw: f32,
    pub mean_pitch: f32,
    pub mean_away_score: f32,
    pub mean_closed_score: f32,
    pub pose_samples: usize,
    pub gaze_samples: usize,
}

/// Fixed-capacity rolling windows over head pose and gaze/eye signals.
///
/// When no face is present this tick the buffers are left alone: a momentary
/// face-detection dropout must not reset smoothed head orientation. Only the
/// separate absence timer in the state machine reacts to sustained dropout.
pub struct SignalSmoother {
    pose_buffer: VecDeque<PoseSample>,
    gaze_buffer: VecDeque<GazeSample>,
    capacity: usize,
}

impl SignalSmoother {
    pub fn new(capacity: usize) -> Self {
        Self {
            pose_buffer: VecDeque::with_capacity(capacity),
            gaze_buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn update(
        &mut self,
        pose: Option<PoseSample>,
        gaze: Option<GazeSample>,
    ) -> SmoothedSignal {
        if let Some(sample) = pose {
            self.pose_buffer.push_back(sample);
            if self.pose_buffer.len() > self.capacity {
                self.pose_buffer.pop_front();
            }
        }
        if let Some(sample) = gaze {
            self.gaze_buffer.push_back(sample);
            if self.gaze_buffer.len() > self.capacity {
                self.gaze_buffer.pop_front();
            }
        }
        self.current()
    }

    pub fn current(&self) -> SmoothedSignal {
        let pose_len = self.pose_buffer.len();
        let gaze_len = self.gaze_buffer.len();

        let (mut yaw_sum, mut pitch_sum) = (0.0_f32, 0.0_f32);
        for sample in &self.pose_buffer {
            yaw_sum += sample.yaw;
            pitch_sum += sample.pitch;
        }

        let (mut away_sum, mut closed_sum) = (0.0_f32, 0.0_f32);
        for sample in &self.gaze_buffer {
            away_sum += sample.away_score;
            closed_sum += sample.closed_score;
        }

        SmoothedSignal {
            mean_yaw: if pose_len > 0 { yaw_sum / pose_len as f32 } else { 0.0 },
            mean_pitch: if pose_len > 0 { pitch_sum / pose_len as f32 } else { 0.0 },
            mean_away_score: if gaze_len > 0 { away_sum / gaze_len as f32 } else { 0.0 },
            mean_closed_score: if gaze_len > 0 { closed_sum / gaze_len as f32 } else { 0.0 },
            pose_samples: pose_len,
            gaze_samples: gaze_len,
        }
    }

    pub fn reset(&mut self) {
        self.pose_buffer.clear();
        self.gaze_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(yaw: f32, pitch: f32) -> PoseSample {
        PoseSample {
            yaw,
            pitch,
            roll: 0.0,
        }
    }

    #[test]
    fn empty_smoother_reports_zero_means() {
        let smoother = SignalSmoother::new(10);
        let signal = smoother.current();
        assert_eq!(signal.mean_yaw, 0.0);
        assert_eq!(signal.pose_samples, 0);
    }

    #[test]
    fn means_track_the_window_contents() {
        let mut smoother = SignalSmoother::new(10);
        smoother.update(Some(pose(10.0, 0.0)), None);
        let signal = smoother.update(Some(pose(30.0, 0.0)), None);
        assert!((signal.mean_yaw - 20.0).abs() < f32::EPSILON);
        assert_eq!(signal.pose_samples, 2);
    }

    #[test]
    fn window_evicts_oldest_beyond_capacity() {
        let mut smoother = SignalSmoother::new(3);
        for yaw in [1.0, 2.0, 3.0, 4.0] {
            smoother.update(Some(pose(yaw, 0.0)), None);
        }
        let signal = smoother.current();
        assert_eq!(signal.pose_samples, 3);
        assert!((signal.mean_yaw - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn absent_face_leaves_stale_averages_in_place() {
        let mut smoother = SignalSmoother::new(10);
        smoother.update(
            Some(pose(40.0, 0.0)),
            Some(GazeSample {
                away_score: 0.5,
                closed_score: 0.0,
            }),
        );
        let signal = smoother.update(None, None);
        assert!((signal.mean_yaw - 40.0).abs() < f32::EPSILON);
        assert!((signal.mean_away_score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn pose_and_gaze_windows_are_independent() {
        let mut smoother = SignalSmoother::new(10);
        let signal = smoother.update(
            Some(pose(10.0, 5.0)),
            None,
        );
        assert_eq!(signal.pose_samples, 1);
        assert_eq!(signal.gaze_samples, 0);
    }
}
