use std::{sync::Arc, time::Duration, time::Instant};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::{
    db::Database,
    fusion::{DistractionTaxonomy, FusionConfig, FusionPipeline},
    metrics::MetricsCollector,
    models::{Achievement, Pause, Session, SessionStats, SessionStatus, SessionSummary},
    scoring::{FocusScoreEngine, ScoringConfig, TimelineBucket},
    sensing::{ModelSet, SensingContext, SensingController},
};

use super::state::{SessionPhase, SessionState};

/// Drives the lifecycle of study sessions: one at a time, each owning its
/// fusion pipeline and score engine exclusively. All mutation goes through
/// the state mutex, so tick ordering and lifecycle changes never interleave.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    db: Database,
    models: ModelSet,
    taxonomy: DistractionTaxonomy,
    fusion_config: FusionConfig,
    scoring_config: ScoringConfig,
    engine: Arc<Mutex<FocusScoreEngine>>,
    sensing: Arc<Mutex<SensingController>>,
    metrics: MetricsCollector,
    tick_interval: Duration,
    achievement_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<Achievement>>>>,
}

impl SessionController {
    pub fn new(
        db: Database,
        models: ModelSet,
        fusion_config: FusionConfig,
        scoring_config: ScoringConfig,
    ) -> Result<Self> {
        fusion_config
            .validate()
            .context("invalid fusion configuration")?;
        scoring_config
            .validate()
            .context("invalid scoring configuration")?;

        Ok(Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            db,
            models,
            taxonomy: DistractionTaxonomy::default(),
            engine: Arc::new(Mutex::new(FocusScoreEngine::new(scoring_config.clone()))),
            fusion_config,
            scoring_config,
            sensing: Arc::new(Mutex::new(SensingController::new())),
            metrics: MetricsCollector::new(),
            tick_interval: Duration::from_secs(1),
            achievement_rx: Arc::new(Mutex::new(None)),
        })
    }

    /// Overrides the 1 s tick cadence, for faster frame loops and tests.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Marks sessions abandoned by a previous process as interrupted. Call
    /// once at startup, before starting new sessions.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let updated = self.db.mark_stale_sessions_interrupted(Utc::now()).await?;
        if updated > 0 {
            info!("marked {updated} stale session(s) as interrupted");
        }
        Ok(updated)
    }

    pub async fn start(&self, subject: &str) -> Result<SessionState> {
        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        // Claim the single session slot before the first await; a racing
        // start must fail here, not after it has reset the live engine.
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Idle {
                return Err(anyhow!("session already active"));
            }
            state.begin_session(
                session_id.clone(),
                subject.to_string(),
                started_at,
                Instant::now(),
            );
            state.clone()
        };

        if let Err(err) = self.start_pipeline(&session_id, subject, started_at).await {
            // Release the claim and void the row so nothing stays Running.
            self.state.lock().await.clear();
            *self.achievement_rx.lock().await = None;
            let now = Utc::now();
            let _ = self
                .db
                .mark_session_status(&session_id, SessionStatus::Cancelled, 0, 0, Some(now), now)
                .await;
            return Err(err);
        }

        info!("session {session_id} started for subject '{subject}'");
        Ok(snapshot)
    }

    async fn start_pipeline(
        &self,
        session_id: &str,
        subject: &str,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        let session = Session {
            id: session_id.to_string(),
            subject: subject.to_string(),
            started_at,
            stopped_at: None,
            status: SessionStatus::Running,
            active_ms: 0,
            paused_ms: 0,
            created_at: started_at,
            updated_at: started_at,
        };
        self.db.insert_session(&session).await?;

        self.engine.lock().await.start(started_at);
        self.metrics.reset().await;

        let pipeline = FusionPipeline::new(self.fusion_config.clone(), self.taxonomy.clone())?;
        let (achievement_tx, achievement_rx) = mpsc::unbounded_channel();
        *self.achievement_rx.lock().await = Some(achievement_rx);

        let ctx = SensingContext {
            session_id: session_id.to_string(),
            models: self.models.clone(),
            pipeline,
            engine: self.engine.clone(),
            metrics: self.metrics.clone(),
            achievements: achievement_tx,
            tick_interval: self.tick_interval,
            object_tick_cadence: self.fusion_config.object_tick_cadence,
        };
        self.sensing.lock().await.start_sensing(ctx)
    }

    /// Freezes all accumulation without resetting fusion state.
    pub async fn pause(&self) -> Result<()> {
        let session_id = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Running {
                return Err(anyhow!("no running session to pause"));
            }
            state.pause(Instant::now());
            state
                .session_id
                .clone()
                .ok_or_else(|| anyhow!("missing session id"))?
        };

        self.sensing.lock().await.set_paused(true);

        let now = Utc::now();
        self.db
            .insert_pause(&Pause {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.clone(),
                pause_started_at: now,
                pause_ended_at: None,
                duration_ms: None,
            })
            .await?;

        let (active_ms, paused_ms) = self.current_durations().await;
        self.db
            .mark_session_status(
                &session_id,
                SessionStatus::Paused,
                active_ms,
                paused_ms,
                None,
                now,
            )
            .await
    }

    pub async fn resume(&self) -> Result<()> {
        let session_id = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Paused {
                return Err(anyhow!("no paused session to resume"));
            }
            state.resume(Instant::now());
            state
                .session_id
                .clone()
                .ok_or_else(|| anyhow!("missing session id"))?
        };

        self.sensing.lock().await.set_paused(false);

        let now = Utc::now();
        self.db.finalize_open_pauses(&session_id, now).await?;

        let (active_ms, paused_ms) = self.current_durations().await;
        self.db
            .mark_session_status(
                &session_id,
                SessionStatus::Running,
                active_ms,
                paused_ms,
                None,
                now,
            )
            .await
    }

    /// Finalizes the accumulator into an immutable summary, persists it, and
    /// releases all per-session buffers.
    pub async fn end(&self) -> Result<SessionSummary> {
        let stopped_at = Utc::now();

        let (session_id, subject, active_ms, paused_ms) = {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::Idle {
                return Err(anyhow!("no active session to end"));
            }
            state.stop();
            (
                state
                    .session_id
                    .clone()
                    .ok_or_else(|| anyhow!("missing session id"))?,
                state.subject.clone().unwrap_or_default(),
                state.active_ms,
                state.paused_ms,
            )
        };

        self.sensing.lock().await.stop_sensing().await?;
        self.db.finalize_open_pauses(&session_id, stopped_at).await?;

        let summary = {
            let engine = self.engine.lock().await;
            engine.finalize(&session_id, &subject)
        };

        self.db.insert_summary(&summary).await?;
        self.db
            .mark_session_status(
                &session_id,
                SessionStatus::Completed,
                active_ms,
                paused_ms,
                Some(stopped_at),
                stopped_at,
            )
            .await?;

        self.state.lock().await.clear();
        *self.achievement_rx.lock().await = None;

        info!(
            "session {session_id} completed with focus score {}",
            summary.focus_score
        );
        Ok(summary)
    }

    /// Discards the active session without producing a summary.
    pub async fn cancel(&self) -> Result<()> {
        let cancelled_at = Utc::now();
        let session_id = {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::Idle {
                return Ok(());
            }
            state.stop();
            let id = state
                .session_id
                .clone()
                .ok_or_else(|| anyhow!("no active session to cancel"))?;
            state.clear();
            id
        };

        self.sensing.lock().await.stop_sensing().await?;
        *self.achievement_rx.lock().await = None;

        self.db.finalize_open_pauses(&session_id, cancelled_at).await?;
        self.db
            .mark_session_status(
                &session_id,
                SessionStatus::Cancelled,
                0,
                0,
                Some(cancelled_at),
                cancelled_at,
            )
            .await
    }

    pub async fn snapshot(&self) -> SessionState {
        let mut state = self.state.lock().await;
        state.sync_from_anchors();
        state.clone()
    }

    /// Live accumulator view for display while the session runs.
    pub async fn stats(&self) -> SessionStats {
        self.engine.lock().await.stats()
    }

    pub async fn timeline(&self) -> Vec<TimelineBucket> {
        self.engine.lock().await.timeline()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        &self.scoring_config
    }

    /// Hands the achievement stream for the active session to the consumer.
    /// Returns `None` when no session is active or it was already taken.
    pub async fn take_achievements(&self) -> Option<mpsc::UnboundedReceiver<Achievement>> {
        self.achievement_rx.lock().await.take()
    }

    async fn current_durations(&self) -> (u64, u64) {
        let state = self.state.lock().await;
        (state.current_active_ms(), state.current_paused_ms())
    }
}
