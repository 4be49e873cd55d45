use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fusion::AttentionState;

/// Timing breakdown for one processed tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickMetrics {
    pub timestamp: DateTime<Utc>,
    pub face_ms: u64,
    /// `None` on ticks where the object path was throttled.
    pub object_ms: Option<u64>,
    pub total_ms: u64,
    pub state: AttentionState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub recent_ticks: Vec<TickMetrics>,
    pub tick_count: u64,
    pub object_call_count: u64,
}
