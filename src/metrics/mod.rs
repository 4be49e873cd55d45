mod types;

pub use types::{MetricsSnapshot, TickMetrics};

use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RECENT_TICKS: usize = 20;

/// Bounded window of recent tick timings, for observing model latency
/// without unbounded growth.
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_ticks: Vec<TickMetrics>,
    tick_count: u64,
    object_call_count: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_ticks: Vec::with_capacity(MAX_RECENT_TICKS),
                tick_count: 0,
                object_call_count: 0,
            })),
        }
    }

    pub async fn record_tick(&self, metrics: TickMetrics) {
        let mut state = self.inner.lock().await;

        state.tick_count += 1;
        if metrics.object_ms.is_some() {
            state.object_call_count += 1;
        }

        state.recent_ticks.push(metrics);
        if state.recent_ticks.len() > MAX_RECENT_TICKS {
            state.recent_ticks.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;
        MetricsSnapshot {
            recent_ticks: state.recent_ticks.clone(),
            tick_count: state.tick_count,
            object_call_count: state.object_call_count,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        state.recent_ticks.clear();
        state.tick_count = 0;
        state.object_call_count = 0;
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::AttentionState;
    use chrono::Utc;

    fn tick(object: bool) -> TickMetrics {
        TickMetrics {
            timestamp: Utc::now(),
            face_ms: 3,
            object_ms: object.then_some(12),
            total_ms: 16,
            state: AttentionState::Focused,
        }
    }

    #[tokio::test]
    async fn recent_window_is_bounded() {
        let collector = MetricsCollector::new();
        for i in 0..30 {
            collector.record_tick(tick(i % 2 == 0)).await;
        }
        let snapshot = collector.get_snapshot().await;
        assert_eq!(snapshot.recent_ticks.len(), MAX_RECENT_TICKS);
        assert_eq!(snapshot.tick_count, 30);
        assert_eq!(snapshot.object_call_count, 15);
    }

    #[tokio::test]
    async fn reset_clears_counters() {
        let collector = MetricsCollector::new();
        collector.record_tick(tick(true)).await;
        collector.reset().await;
        let snapshot = collector.get_snapshot().await;
        assert_eq!(snapshot.tick_count, 0);
        assert!(snapshot.recent_ticks.is_empty());
    }
}
