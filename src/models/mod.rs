pub mod achievement;
pub mod session;
pub mod summary;

pub use achievement::{Achievement, AchievementKind};
pub use session::{Pause, Session, SessionStatus};
pub use summary::{DetectionCounts, SessionAnalytics, SessionStats, SessionSummary};
