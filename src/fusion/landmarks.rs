use serde::{Deserialize, Serialize};

/// One normalized facial landmark point as produced by the landmark model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One blendshape-style per-feature scalar, e.g. `eyeBlinkLeft`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blendshape {
    pub category: String,
    pub score: f32,
}

/// Everything the face model reports for one frame. Absence of the whole
/// frame means no face this tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceFrame {
    pub landmarks: Vec<LandmarkPoint>,
    pub blendshapes: Vec<Blendshape>,
}

/// Degrees-equivalent head orientation for one tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PoseSample {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Gaze-offset and eye-closure scores for one tick, both in [0,1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub away_score: f32,
    pub closed_score: f32,
}

// Landmark indices in the face model's canonical mesh.
const NOSE_TIP: usize = 1;
const LEFT_EYE: usize = 33;
const RIGHT_EYE: usize = 263;
const LEFT_EAR: usize = 234;
const RIGHT_EAR: usize = 454;

// Scale factors mapping normalized landmark offsets to degrees-equivalent
// angles. Tuned against the downstream head-angle limit, not true geometry.
const YAW_PITCH_SCALE: f32 = 120.0;
const ROLL_SCALE: f32 = 100.0;

const EYE_LOOK_CATEGORIES: [&str; 4] = [
    "eyeLookUpLeft",
    "eyeLookDownLeft",
    "eyeLookOutLeft",
    "eyeLookInLeft",
];
const EYE_BLINK_CATEGORY: &str = "eyeBlinkLeft";

/// Derive yaw/pitch/roll from the key landmark points. Returns `None` when
/// the landmark list is too short to index safely.
pub fn head_pose_from_landmarks(landmarks: &[LandmarkPoint]) -> Option<PoseSample> {
    let nose = landmarks.get(NOSE_TIP)?;
    let l_eye = landmarks.get(LEFT_EYE)?;
    let r_eye = landmarks.get(RIGHT_EYE)?;
    let l_ear = landmarks.get(LEFT_EAR)?;
    let r_ear = landmarks.get(RIGHT_EAR)?;

    let eye_mid_x = (l_eye.x + r_eye.x) / 2.0;
    let eye_mid_y = (l_eye.y + r_eye.y) / 2.0;

    Some(PoseSample {
        yaw: (nose.x - eye_mid_x) * YAW_PITCH_SCALE,
        pitch: (nose.y - eye_mid_y) * YAW_PITCH_SCALE,
        roll: (r_ear.x - l_ear.x) * ROLL_SCALE,
    })
}

/// Derive gaze-offset and eye-closure from blendshape scalars. Missing
/// categories read as 0.0; `away_score` is the strongest of the four
/// eye-look directions.
pub fn gaze_from_blendshapes(blendshapes: &[Blendshape]) -> GazeSample {
    let score_of = |category: &str| -> f32 {
        blendshapes
            .iter()
            .find(|shape| shape.category == category)
            .map(|shape| shape.score.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    };

    let away_score = EYE_LOOK_CATEGORIES
        .iter()
        .map(|category| score_of(category))
        .fold(0.0_f32, f32::max);

    GazeSample {
        away_score,
        closed_score: score_of(EYE_BLINK_CATEGORY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_with(overrides: &[(usize, LandmarkPoint)]) -> Vec<LandmarkPoint> {
        let mut landmarks = vec![LandmarkPoint::default(); 478];
        for (index, point) in overrides {
            landmarks[*index] = *point;
        }
        landmarks
    }

    fn point(x: f32, y: f32) -> LandmarkPoint {
        LandmarkPoint { x, y, z: 0.0 }
    }

    #[test]
    fn centered_face_yields_near_zero_angles() {
        let landmarks = mesh_with(&[
            (NOSE_TIP, point(0.5, 0.55)),
            (LEFT_EYE, point(0.45, 0.55)),
            (RIGHT_EYE, point(0.55, 0.55)),
            (LEFT_EAR, point(0.4, 0.55)),
            (RIGHT_EAR, point(0.6, 0.55)),
        ]);
        let pose = head_pose_from_landmarks(&landmarks).unwrap();
        assert!(pose.yaw.abs() < 1.0);
        assert!(pose.pitch.abs() < 1.0);
    }

    #[test]
    fn turned_head_produces_large_yaw() {
        let landmarks = mesh_with(&[
            (NOSE_TIP, point(0.8, 0.55)),
            (LEFT_EYE, point(0.45, 0.55)),
            (RIGHT_EYE, point(0.55, 0.55)),
        ]);
        let pose = head_pose_from_landmarks(&landmarks).unwrap();
        assert!(pose.yaw > 25.0);
    }

    #[test]
    fn short_landmark_list_yields_none() {
        let landmarks = vec![LandmarkPoint::default(); 10];
        assert!(head_pose_from_landmarks(&landmarks).is_none());
    }

    #[test]
    fn gaze_takes_max_of_look_directions() {
        let blendshapes = vec![
            Blendshape {
                category: "eyeLookUpLeft".into(),
                score: 0.2,
            },
            Blendshape {
                category: "eyeLookOutLeft".into(),
                score: 0.7,
            },
            Blendshape {
                category: "eyeBlinkLeft".into(),
                score: 0.1,
            },
        ];
        let gaze = gaze_from_blendshapes(&blendshapes);
        assert_eq!(gaze.away_score, 0.7);
        assert_eq!(gaze.closed_score, 0.1);
    }

    #[test]
    fn missing_categories_read_as_zero() {
        let gaze = gaze_from_blendshapes(&[]);
        assert_eq!(gaze.away_score, 0.0);
        assert_eq!(gaze.closed_score, 0.0);
    }
}
