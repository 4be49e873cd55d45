use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

/// Live lifecycle state of the active session. Wall-clock timestamps are for
/// records; elapsed accounting runs on monotonic anchors so a clock jump
/// cannot corrupt the durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    pub subject: Option<String>,
    pub active_ms: u64,
    pub paused_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    /// Time accumulated from earlier running windows; combines with
    /// `running_anchor` to compute the true active duration.
    #[serde(skip)]
    pub active_ms_baseline: u64,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
    #[serde(skip)]
    pub paused_ms_baseline: u64,
    #[serde(skip)]
    pub paused_anchor: Option<Instant>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            session_id: None,
            subject: None,
            active_ms: 0,
            paused_ms: 0,
            started_at: None,
            active_ms_baseline: 0,
            running_anchor: None,
            paused_ms_baseline: 0,
            paused_anchor: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_active_ms(&self) -> u64 {
        if let (SessionPhase::Running, Some(anchor)) = (self.phase, self.running_anchor) {
            self.active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64)
        } else {
            self.active_ms
        }
    }

    pub fn current_paused_ms(&self) -> u64 {
        if let (SessionPhase::Paused, Some(anchor)) = (self.phase, self.paused_anchor) {
            self.paused_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64)
        } else {
            self.paused_ms
        }
    }

    pub fn sync_from_anchors(&mut self) {
        self.active_ms = self.current_active_ms();
        self.paused_ms = self.current_paused_ms();
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        subject: String,
        start_at: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            phase: SessionPhase::Running,
            session_id: Some(session_id),
            subject: Some(subject),
            active_ms: 0,
            paused_ms: 0,
            started_at: Some(start_at),
            active_ms_baseline: 0,
            running_anchor: Some(now),
            paused_ms_baseline: 0,
            paused_anchor: None,
        };
    }

    pub fn pause(&mut self, now: Instant) {
        self.sync_from_anchors();
        self.phase = SessionPhase::Paused;
        self.running_anchor = None;
        self.active_ms_baseline = self.active_ms;
        self.paused_anchor = Some(now);
        self.paused_ms_baseline = self.paused_ms;
    }

    pub fn resume(&mut self, now: Instant) {
        self.sync_from_anchors();
        self.phase = SessionPhase::Running;
        self.paused_anchor = None;
        self.paused_ms_baseline = self.paused_ms;
        self.running_anchor = Some(now);
        self.active_ms_baseline = self.active_ms;
    }

    pub fn stop(&mut self) {
        self.sync_from_anchors();
        self.phase = SessionPhase::Stopped;
        self.running_anchor = None;
        self.paused_anchor = None;
        self.active_ms_baseline = self.active_ms;
        self.paused_ms_baseline = self.paused_ms;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
