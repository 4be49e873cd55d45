use std::sync::Arc;

use anyhow::Result;

use crate::fusion::{FaceFrame, RawDetection};

/// The pretrained object-presence detector, treated as a black box. Called at
/// a throttled cadence; may return an empty list. Errors and timeouts are
/// handled by the loop as "no detections this tick", never as fusion errors.
///
/// Implementations may block; the loop invokes them on a blocking worker.
pub trait ObjectModel: Send + Sync + 'static {
    fn detect(&self, tick: u64) -> Result<Vec<RawDetection>>;
}

/// The facial-landmark/pose model, treated as a black box. `None` means no
/// face this tick.
pub trait FaceModel: Send + Sync + 'static {
    fn detect_face(&self, tick: u64) -> Result<Option<FaceFrame>>;
}

/// The pair of external model collaborators a session pipeline runs against.
#[derive(Clone)]
pub struct ModelSet {
    pub object: Arc<dyn ObjectModel>,
    pub face: Arc<dyn FaceModel>,
}

impl ModelSet {
    pub fn new(object: Arc<dyn ObjectModel>, face: Arc<dyn FaceModel>) -> Self {
        Self { object, face }
    }
}
