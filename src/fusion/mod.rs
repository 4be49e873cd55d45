pub mod config;
pub mod landmarks;
pub mod smoother;
pub mod stabilizer;
pub mod state_machine;
pub mod taxonomy;

pub use config::FusionConfig;
pub use landmarks::{
    gaze_from_blendshapes, head_pose_from_landmarks, Blendshape, FaceFrame, GazeSample,
    LandmarkPoint, PoseSample,
};
pub use smoother::{SignalSmoother, SmoothedSignal};
pub use stabilizer::{BoundingBox, ObjectStabilizer, RawDetection, StabilizedDistraction};
pub use state_machine::{
    AttentionState, AttentionStateMachine, DistractionCause, StateOutcome, TickInput,
};
pub use taxonomy::{DistractionTaxonomy, PriorityTier, TaxonomyEntry};

use anyhow::{Context, Result};

/// The full per-session fusion pipeline: stabilizer, smoother, and state
/// machine wired to one validated config. Raw detections and face frames go
/// in; one debounced attention outcome comes out per tick.
pub struct FusionPipeline {
    pub stabilizer: ObjectStabilizer,
    pub smoother: SignalSmoother,
    pub state_machine: AttentionStateMachine,
}

impl FusionPipeline {
    pub fn new(config: FusionConfig, taxonomy: DistractionTaxonomy) -> Result<Self> {
        config.validate().context("invalid fusion configuration")?;
        Ok(Self {
            stabilizer: ObjectStabilizer::new(
                taxonomy,
                config.detection_buffer_len,
                config.min_consistency,
                config.acceptance_threshold,
            ),
            smoother: SignalSmoother::new(config.smoothing_window),
            state_machine: AttentionStateMachine::new(config),
        })
    }

    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.smoother.reset();
        self.state_machine.reset();
    }
}
