use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::taxonomy::{DistractionTaxonomy, PriorityTier};

/// One raw per-frame detection from the object model. Ephemeral; never kept
/// beyond the stabilization window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A distraction that has persisted long enough across the rolling buffer to
/// be treated as real rather than single-frame noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilizedDistraction {
    pub label: String,
    pub tier: PriorityTier,
    pub severity: f32,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    pub consistency_count: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    label: String,
    tier: PriorityTier,
    severity: f32,
    confidence: f32,
    bounding_box: BoundingBox,
}

/// Debounces per-frame object detections.
///
/// Each tick the single highest-priority surviving detection (or an empty
/// slot) is pushed into a fixed FIFO buffer; a distraction is only reported
/// once its label occupies at least `min_consistency` slots. Upstream models
/// routinely emit single-frame false positives, which would otherwise cause
/// score flicker.
pub struct ObjectStabilizer {
    taxonomy: DistractionTaxonomy,
    buffer: VecDeque<Option<Candidate>>,
    capacity: usize,
    min_consistency: usize,
    acceptance_threshold: f32,
}

impl ObjectStabilizer {
    pub fn new(
        taxonomy: DistractionTaxonomy,
        capacity: usize,
        min_consistency: usize,
        acceptance_threshold: f32,
    ) -> Self {
        Self {
            taxonomy,
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            min_consistency,
            acceptance_threshold,
        }
    }

    /// Feed one tick's detections (possibly empty when the object path is
    /// throttled or the model faulted) and report the stabilized distraction,
    /// if any. Out-of-range confidences are clamped, not rejected.
    pub fn ingest(&mut self, detections: &[RawDetection]) -> Option<StabilizedDistraction> {
        let selected = self.select_candidate(detections);

        self.buffer.push_back(selected);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }

        self.stabilized()
    }

    fn select_candidate(&self, detections: &[RawDetection]) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for detection in detections {
            let Some(entry) = self.taxonomy.lookup(&detection.label) else {
                continue;
            };
            let confidence = detection.confidence.clamp(0.0, 1.0);
            if confidence < self.acceptance_threshold {
                continue;
            }
            let candidate = Candidate {
                label: detection.label.trim().to_lowercase(),
                tier: entry.tier,
                severity: entry.severity,
                confidence,
                bounding_box: detection.bounding_box,
            };
            let replace = match &best {
                None => true,
                Some(current) => {
                    (candidate.tier, candidate.confidence) > (current.tier, current.confidence)
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }

    /// Pick the label that has reached the consistency threshold, preferring
    /// the higher tier when several qualify in the same tick.
    fn stabilized(&self) -> Option<StabilizedDistraction> {
        let mut winner: Option<(usize, &Candidate)> = None;
        for slot in self.buffer.iter().rev() {
            let Some(candidate) = slot else { continue };
            let count = self
                .buffer
                .iter()
                .flatten()
                .filter(|other| other.label == candidate.label)
                .count();
            if count < self.min_consistency {
                continue;
            }
            let better = match &winner {
                None => true,
                Some((_, current)) => candidate.tier > current.tier,
            };
            if better {
                winner = Some((count, candidate));
            }
        }

        winner.map(|(count, candidate)| StabilizedDistraction {
            label: candidate.label.clone(),
            tier: candidate.tier,
            severity: candidate.severity,
            confidence: candidate.confidence,
            bounding_box: candidate.bounding_box,
            consistency_count: count,
        })
    }

    /// Clears the rolling buffer. Only called at session boundaries; the
    /// buffer must survive sparse cadences within a session.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, confidence: f32) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence,
            bounding_box: BoundingBox::default(),
        }
    }

    fn stabilizer() -> ObjectStabilizer {
        ObjectStabilizer::new(DistractionTaxonomy::default(), 5, 2, 0.3)
    }

    #[test]
    fn single_frame_detection_is_never_reported() {
        let mut s = stabilizer();
        assert!(s.ingest(&[detection("cell phone", 0.9)]).is_none());
    }

    #[test]
    fn reports_on_second_consistent_tick() {
        let mut s = stabilizer();
        assert!(s.ingest(&[detection("cell phone", 0.5)]).is_none());
        let second = s.ingest(&[detection("cell phone", 0.5)]).unwrap();
        assert_eq!(second.label, "cell phone");
        assert_eq!(second.consistency_count, 2);
        let third = s.ingest(&[detection("cell phone", 0.5)]).unwrap();
        assert_eq!(third.consistency_count, 3);
    }

    #[test]
    fn empty_ticks_push_empty_slots_and_eventually_clear() {
        let mut s = stabilizer();
        s.ingest(&[detection("cell phone", 0.9)]);
        s.ingest(&[detection("cell phone", 0.9)]);
        assert!(s.ingest(&[]).is_some()); // still two in a 5-slot buffer
        s.ingest(&[]);
        s.ingest(&[]);
        // first phone entry evicted, one remains
        assert!(s.ingest(&[]).is_none());
    }

    #[test]
    fn low_confidence_detections_are_filtered() {
        let mut s = stabilizer();
        for _ in 0..5 {
            assert!(s.ingest(&[detection("cell phone", 0.2)]).is_none());
        }
    }

    #[test]
    fn unknown_labels_are_ignored() {
        let mut s = stabilizer();
        for _ in 0..5 {
            assert!(s.ingest(&[detection("person", 0.99)]).is_none());
        }
    }

    #[test]
    fn higher_tier_wins_among_simultaneous_survivors() {
        let mut s = stabilizer();
        let frame = [detection("cup", 0.95), detection("cell phone", 0.4)];
        s.ingest(&frame);
        let stabilized = s.ingest(&frame).unwrap();
        assert_eq!(stabilized.label, "cell phone");
        assert_eq!(stabilized.tier, PriorityTier::Critical);
    }

    #[test]
    fn higher_tier_wins_when_two_labels_both_reach_threshold() {
        let mut s = stabilizer();
        // Alternate so both labels accumulate two entries in the buffer.
        s.ingest(&[detection("cup", 0.9)]);
        s.ingest(&[detection("cell phone", 0.4)]);
        s.ingest(&[detection("cup", 0.9)]);
        let stabilized = s.ingest(&[detection("cell phone", 0.4)]).unwrap();
        assert_eq!(stabilized.tier, PriorityTier::Critical);
    }

    #[test]
    fn confidence_outside_unit_range_is_clamped() {
        let mut s = stabilizer();
        s.ingest(&[detection("cell phone", 1.7)]);
        let stabilized = s.ingest(&[detection("cell phone", 1.7)]).unwrap();
        assert_eq!(stabilized.confidence, 1.0);
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let mut s = stabilizer();
        for _ in 0..20 {
            s.ingest(&[detection("cell phone", 0.9)]);
        }
        assert!(s.buffer.len() <= 5);
    }
}
