use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{
    DetectionCounts, Pause, Session, SessionAnalytics, SessionStatus, SessionSummary,
};
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn status_from_str(value: &str) -> Result<SessionStatus> {
    match value {
        "Running" => Ok(SessionStatus::Running),
        "Paused" => Ok(SessionStatus::Paused),
        "Completed" => Ok(SessionStatus::Completed),
        "Cancelled" => Ok(SessionStatus::Cancelled),
        "Interrupted" => Ok(SessionStatus::Interrupted),
        _ => Err(anyhow!("unknown session status '{value}'")),
    }
}

/// SQLite store for sessions, pauses, and finalized summaries.
///
/// All access funnels through one dedicated worker thread; callers submit
/// closures and await the reply over a oneshot channel, so async tasks never
/// block on the connection.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("focuslens-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(
                            anyhow::Error::new(err).context("failed to open SQLite database")
                        ));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, subject, started_at, stopped_at, status, active_ms, paused_ms, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.subject,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.active_ms)?,
                    to_i64(record.paused_ms)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
    }

    pub async fn mark_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        active_ms: u64,
        paused_ms: u64,
        stopped_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     active_ms = ?2,
                     paused_ms = ?3,
                     stopped_at = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    status.as_str(),
                    to_i64(active_ms)?,
                    to_i64(paused_ms)?,
                    stopped_at.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )
            .with_context(|| "failed to update session status")?;
            Ok(())
        })
        .await
    }

    pub async fn insert_pause(&self, pause: &Pause) -> Result<()> {
        let record = pause.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO pauses (id, session_id, pause_started_at, pause_ended_at, duration_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.session_id,
                    record.pause_started_at.to_rfc3339(),
                    record.pause_ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.duration_ms.map(to_i64).transpose()?,
                ],
            )
            .with_context(|| "failed to insert pause record")?;
            Ok(())
        })
        .await
    }

    pub async fn finalize_open_pauses(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pause_started_at FROM pauses
                 WHERE session_id = ?1 AND pause_ended_at IS NULL",
            )?;

            let mut rows = stmt.query(params![session_id.clone()])?;
            while let Some(row) = rows.next()? {
                let pause_id: String = row.get(0)?;
                let started_at = parse_datetime(&row.get::<_, String>(1)?)?;
                let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
                conn.execute(
                    "UPDATE pauses
                     SET pause_ended_at = ?1,
                         duration_ms = ?2
                     WHERE id = ?3",
                    params![ended_at.to_rfc3339(), to_i64(duration_ms)?, pause_id],
                )?;
            }

            Ok(())
        })
        .await
    }

    pub async fn insert_summary(&self, summary: &SessionSummary) -> Result<()> {
        let record = summary.clone();
        self.execute(move |conn| {
            let hourly_focus = serde_json::to_string(&record.analytics.hourly_focus)
                .context("failed to encode hourly focus")?;
            conn.execute(
                "INSERT INTO session_summaries (session_id, subject, duration_minutes, focus_score,
                     phone_detections, distracted_secs, focused_secs, away_secs,
                     hourly_focus, recovery_rate, distraction_resistance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.session_id,
                    record.subject,
                    i64::from(record.duration_minutes),
                    i64::from(record.focus_score),
                    i64::from(record.detections.phone),
                    to_i64(record.detections.distracted)?,
                    to_i64(record.detections.focused)?,
                    to_i64(record.detections.away)?,
                    hourly_focus,
                    record.analytics.recovery_rate,
                    record.analytics.distraction_resistance,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session summary")?;
            Ok(())
        })
        .await
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, subject, duration_minutes, focus_score,
                        phone_detections, distracted_secs, focused_secs, away_secs,
                        hourly_focus, recovery_rate, distraction_resistance
                 FROM session_summaries
                 WHERE session_id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            if let Some(row) = rows.next()? {
                let hourly_focus: [f64; 24] =
                    serde_json::from_str(&row.get::<_, String>(8)?)
                        .context("failed to decode hourly focus")?;
                Ok(Some(SessionSummary {
                    session_id: row.get(0)?,
                    subject: row.get(1)?,
                    duration_minutes: u32::try_from(row.get::<_, i64>(2)?)
                        .map_err(|_| anyhow!("duration_minutes out of range"))?,
                    focus_score: u8::try_from(row.get::<_, i64>(3)?)
                        .map_err(|_| anyhow!("focus_score out of range"))?,
                    detections: DetectionCounts {
                        phone: u32::try_from(row.get::<_, i64>(4)?)
                            .map_err(|_| anyhow!("phone_detections out of range"))?,
                        distracted: to_u64(row.get::<_, i64>(5)?)?,
                        focused: to_u64(row.get::<_, i64>(6)?)?,
                        away: to_u64(row.get::<_, i64>(7)?)?,
                    },
                    analytics: SessionAnalytics {
                        hourly_focus,
                        recovery_rate: row.get(9)?,
                        distraction_resistance: row.get(10)?,
                    },
                }))
            } else {
                Ok(None)
            }
        })
        .await
    }

    pub async fn get_incomplete_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject, started_at, stopped_at, status, active_ms, paused_ms, created_at, updated_at
                 FROM sessions
                 WHERE status IN ('Running', 'Paused')
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(Session {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    started_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    stopped_at: row
                        .get::<_, Option<String>>(3)?
                        .map(|s| parse_datetime(&s))
                        .transpose()?,
                    status: status_from_str(&row.get::<_, String>(4)?)?,
                    active_ms: to_u64(row.get::<_, i64>(5)?)?,
                    paused_ms: to_u64(row.get::<_, i64>(6)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(7)?)?,
                    updated_at: parse_datetime(&row.get::<_, String>(8)?)?,
                });
            }

            Ok(sessions)
        })
        .await
    }

    /// Marks sessions left Running/Paused by a crash as interrupted. Called
    /// once at startup before any new session begins.
    pub async fn mark_stale_sessions_interrupted(&self, now: DateTime<Utc>) -> Result<usize> {
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE sessions
                 SET status = 'Interrupted', updated_at = ?1
                 WHERE status IN ('Running', 'Paused')",
                params![now.to_rfc3339()],
            )?;
            Ok(updated)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session(id: &str) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            subject: "physics".to_string(),
            started_at: now,
            stopped_at: None,
            status: SessionStatus::Running,
            active_ms: 0,
            paused_ms: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn summary(session_id: &str) -> SessionSummary {
        let mut hourly_focus = [0.0; 24];
        hourly_focus[9] = 82.5;
        SessionSummary {
            session_id: session_id.to_string(),
            subject: "physics".to_string(),
            duration_minutes: 25,
            focus_score: 78,
            detections: DetectionCounts {
                phone: 1,
                distracted: 120,
                focused: 1300,
                away: 80,
            },
            analytics: SessionAnalytics {
                hourly_focus,
                recovery_rate: 0.85,
                distraction_resistance: 95.0,
            },
        }
    }

    #[tokio::test]
    async fn summary_round_trips() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).unwrap();

        db.insert_session(&session("s-1")).await.unwrap();
        db.insert_summary(&summary("s-1")).await.unwrap();

        let loaded = db.get_summary("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.focus_score, 78);
        assert_eq!(loaded.detections.phone, 1);
        assert_eq!(loaded.detections.focused, 1300);
        assert!((loaded.analytics.hourly_focus[9] - 82.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_summary_is_none() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).unwrap();
        assert!(db.get_summary("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_sessions_are_marked_interrupted() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).unwrap();

        db.insert_session(&session("s-1")).await.unwrap();
        db.insert_session(&session("s-2")).await.unwrap();
        db.mark_session_status(
            "s-2",
            SessionStatus::Completed,
            1000,
            0,
            Some(Utc::now()),
            Utc::now(),
        )
        .await
        .unwrap();

        let updated = db.mark_stale_sessions_interrupted(Utc::now()).await.unwrap();
        assert_eq!(updated, 1);
        assert!(db.get_incomplete_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_pauses_are_finalized_with_durations() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).unwrap();

        db.insert_session(&session("s-1")).await.unwrap();
        let started = Utc::now();
        db.insert_pause(&Pause {
            id: "p-1".to_string(),
            session_id: "s-1".to_string(),
            pause_started_at: started,
            pause_ended_at: None,
            duration_ms: None,
        })
        .await
        .unwrap();

        db.finalize_open_pauses("s-1", started + chrono::Duration::seconds(30))
            .await
            .unwrap();

        let duration: i64 = db
            .execute(|conn| {
                conn.query_row(
                    "SELECT duration_ms FROM pauses WHERE id = 'p-1'",
                    [],
                    |row| row.get(0),
                )
                .map_err(Into::into)
            })
            .await
            .unwrap();
        assert_eq!(duration, 30_000);
    }
}
