use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::fusion::{
    gaze_from_blendshapes, head_pose_from_landmarks, FusionPipeline, PriorityTier, RawDetection,
    StabilizedDistraction, TickInput,
};
use crate::metrics::{MetricsCollector, TickMetrics};
use crate::models::Achievement;
use crate::scoring::FocusScoreEngine;

use super::collaborators::ModelSet;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const MODEL_TIMEOUT_SECS: u64 = 5;

/// Everything one session's sensing loop needs. Owned by the loop task; the
/// score engine is shared with the session controller, which reads it for
/// live stats and the final summary.
pub struct SensingContext {
    pub session_id: String,
    pub models: ModelSet,
    pub pipeline: FusionPipeline,
    pub engine: Arc<Mutex<FocusScoreEngine>>,
    pub metrics: MetricsCollector,
    pub achievements: mpsc::UnboundedSender<Achievement>,
    pub tick_interval: Duration,
    pub object_tick_cadence: u32,
}

/// Frame-driven tick loop: acquire model results (the only suspension
/// points), then run fusion, state, and scoring synchronously and in strict
/// tick order. A paused session receives no ticks; fusion state stays frozen.
pub async fn sensing_loop(
    mut ctx: SensingContext,
    cancel_token: CancellationToken,
    pause_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(ctx.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick_count: u64 = 0;
    let mut last_tick: Option<Instant> = None;
    let mut stabilized: Option<StabilizedDistraction> = None;
    let mut last_stabilized_label: Option<String> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                if *pause_rx.borrow() {
                    // Paused ticks still advance the anchor so a frozen
                    // span is not credited on resume.
                    last_tick = Some(now);
                    continue;
                }

                // Real elapsed time since the previous tick: a model call
                // that overruns the interval must not shrink recorded time.
                let tick_secs = match last_tick {
                    Some(prev) => now.duration_since(prev).as_secs_f64(),
                    None => ctx.tick_interval.as_secs_f64(),
                };
                last_tick = Some(now);
                tick_count += 1;

                process_tick(
                    &mut ctx,
                    tick_count,
                    tick_secs,
                    &mut stabilized,
                    &mut last_stabilized_label,
                )
                .await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("sensing loop for session {} shutting down", ctx.session_id);
                break;
            }
        }
    }
}

async fn process_tick(
    ctx: &mut SensingContext,
    tick_count: u64,
    tick_secs: f64,
    stabilized: &mut Option<StabilizedDistraction>,
    last_stabilized_label: &mut Option<String>,
) {
    let tick_start = Instant::now();

    // Face path runs every tick.
    let face_start = Instant::now();
    let face_frame = {
        let model = ctx.models.face.clone();
        match with_timeout(tokio::task::spawn_blocking(move || {
            model.detect_face(tick_count)
        }))
        .await
        {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                log_warn!("face model fault on tick {tick_count}, treating as no face: {err:?}");
                None
            }
            None => {
                log_warn!("face model timed out on tick {tick_count}, treating as no face");
                None
            }
        }
    };
    let face_ms = face_start.elapsed().as_millis() as u64;

    // Object path runs on a sparser cadence; the stabilizer's buffer carries
    // across the gap.
    let mut object_ms = None;
    if tick_count % u64::from(ctx.object_tick_cadence) == 0 {
        let object_start = Instant::now();
        let detections: Vec<RawDetection> = {
            let model = ctx.models.object.clone();
            match with_timeout(tokio::task::spawn_blocking(move || model.detect(tick_count))).await
            {
                Some(Ok(list)) => list,
                Some(Err(err)) => {
                    log_warn!(
                        "object model fault on tick {tick_count}, treating as empty: {err:?}"
                    );
                    Vec::new()
                }
                None => {
                    log_warn!("object model timed out on tick {tick_count}, treating as empty");
                    Vec::new()
                }
            }
        };
        *stabilized = ctx.pipeline.stabilizer.ingest(&detections);
        object_ms = Some(object_start.elapsed().as_millis() as u64);
    }

    // From here on everything is synchronous fusion/state/score logic.
    let face_detected = face_frame.is_some();
    let (pose, gaze) = match &face_frame {
        Some(frame) => (
            head_pose_from_landmarks(&frame.landmarks),
            Some(gaze_from_blendshapes(&frame.blendshapes)),
        ),
        None => (None, None),
    };
    let smoothed = ctx.pipeline.smoother.update(pose, gaze);

    let outcome = ctx.pipeline.state_machine.tick(&TickInput {
        face_detected,
        stabilized: stabilized.as_ref(),
        smoothed,
        tick_duration: Duration::from_secs_f64(tick_secs),
    });

    // A stabilization newly appearing (or changing label) is one discrete
    // hit; a persisting one is not re-counted every tick.
    let new_hit = match stabilized {
        Some(current) => {
            let changed = last_stabilized_label.as_deref() != Some(current.label.as_str());
            *last_stabilized_label = Some(current.label.clone());
            changed && current.tier == PriorityTier::Critical
        }
        None => {
            *last_stabilized_label = None;
            false
        }
    };

    let achievements = {
        let mut engine = ctx.engine.lock().await;
        engine.record_tick(outcome.state, tick_secs, Utc::now());
        if outcome.left_focus {
            engine.record_focus_break();
        }
        if new_hit {
            engine.record_object_hit();
        }
        engine.check_streaks()
    };

    if outcome.left_focus {
        log_info!(
            "session {} left focus on tick {tick_count}: {:?}",
            ctx.session_id,
            outcome.cause
        );
    }

    for achievement in achievements {
        log_info!(
            "session {} achievement: {}",
            ctx.session_id,
            achievement.title
        );
        let _ = ctx.achievements.send(achievement);
    }

    ctx.metrics
        .record_tick(TickMetrics {
            timestamp: Utc::now(),
            face_ms,
            object_ms,
            total_ms: tick_start.elapsed().as_millis() as u64,
            state: outcome.state,
        })
        .await;
}

/// Bounds a model call; `None` on timeout, joins worker panics into errors.
async fn with_timeout<T>(
    task: tokio::task::JoinHandle<anyhow::Result<T>>,
) -> Option<anyhow::Result<T>> {
    match tokio::time::timeout(Duration::from_secs(MODEL_TIMEOUT_SECS), task).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(join_err)) => Some(Err(anyhow::anyhow!("model worker panicked: {join_err}"))),
        Err(_) => None,
    }
}
