//! focuslens: fuses noisy per-frame object and face signals into a debounced
//! attention state and a bounded 0-100 focus score with achievement
//! detection, one pipeline per study session.

pub mod db;
pub mod fusion;
pub mod metrics;
pub mod models;
pub mod scoring;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;

pub use db::Database;
pub use fusion::{
    AttentionState, DistractionTaxonomy, FusionConfig, FusionPipeline, PriorityTier,
};
pub use models::{Achievement, SessionStats, SessionSummary};
pub use scoring::{FocusScoreEngine, ScoringConfig};
pub use sensing::{FaceModel, ModelSet, ObjectModel};
pub use session::{SessionController, SessionPhase};
pub use settings::{SettingsStore, TuningSettings};

/// Initializes env_logger once for binaries and tests; safe to call from
/// multiple entry points.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
