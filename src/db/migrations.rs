use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Transaction};

const CURRENT_SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => {
            tx.execute_batch(
                "CREATE TABLE sessions (
                    id TEXT PRIMARY KEY,
                    subject TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    stopped_at TEXT,
                    status TEXT NOT NULL,
                    active_ms INTEGER NOT NULL DEFAULT 0,
                    paused_ms INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE pauses (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL REFERENCES sessions(id),
                    pause_started_at TEXT NOT NULL,
                    pause_ended_at TEXT,
                    duration_ms INTEGER
                );

                CREATE TABLE session_summaries (
                    session_id TEXT PRIMARY KEY REFERENCES sessions(id),
                    subject TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL,
                    focus_score INTEGER NOT NULL,
                    phone_detections INTEGER NOT NULL,
                    distracted_secs INTEGER NOT NULL,
                    focused_secs INTEGER NOT NULL,
                    away_secs INTEGER NOT NULL,
                    hourly_focus TEXT NOT NULL,
                    recovery_rate REAL NOT NULL,
                    distraction_resistance REAL NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX idx_pauses_session ON pauses(session_id);",
            )
            .context("failed to create initial schema")?;
            Ok(())
        }
        other => bail!("unknown schema version {other}"),
    }
}
