use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password_hash   TEXT NOT NULL,
            role            TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS cyber_incidents (
            incident_id     INTEGER PRIMARY KEY,
            domain          TEXT NOT NULL,
            incident_type   TEXT NOT NULL,
            severity        TEXT NOT NULL,
            status          TEXT NOT NULL,
            reported_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cyber_reported
            ON cyber_incidents(reported_at);

        CREATE TABLE IF NOT EXISTS it_incidents (
            incident_id     INTEGER PRIMARY KEY,
            service_name    TEXT NOT NULL,
            incident_type   TEXT NOT NULL,
            severity        TEXT NOT NULL,
            status          TEXT NOT NULL,
            detected_at     TEXT NOT NULL,
            resolved_at     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_it_detected
            ON it_incidents(detected_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
