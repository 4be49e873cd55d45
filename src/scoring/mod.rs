pub mod config;
pub mod engine;
pub mod streaks;

pub use config::ScoringConfig;
pub use engine::{FocusScoreEngine, ScoreAccumulator, SessionHistoryEntry, TimelineBucket};
pub use streaks::StreakTracker;
