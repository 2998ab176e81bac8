use std::time::Duration;

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::types::{AssessmentRecord, FinishedSession, SessionOutcome};
use crate::verdict::Verdict;

/// Opens (or creates) the history database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// `busy_timeout` is set through the `Connection` method rather than a PRAGMA
/// string so it applies regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    // Checkpoint any WAL left over from a previous run.
    conn.call(|db| {
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    conn.call(|db| {
        crate::schema::migrate(db)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}

fn row_to_record(r: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentRecord> {
    let outcome: String = r.get(2)?;
    let verdict: Option<String> = r.get(3)?;
    Ok(AssessmentRecord {
        id: r.get(0)?,
        repository_url: r.get(1)?,
        outcome: SessionOutcome::from_str_lossy(&outcome),
        verdict: verdict.as_deref().map(Verdict::from_str_lossy),
        started_at: r.get(4)?,
        finished_at: r.get(5)?,
        config_keys: r.get(6)?,
    })
}

/// Inserts one finished session and returns its new UUID v4 id.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the `BEGIN IMMEDIATE` transaction fails.
pub async fn record_assessment(
    conn: &Connection,
    session: FinishedSession,
) -> Result<String, tokio_rusqlite::Error> {
    conn.call(move |db| {
        let id = uuid::Uuid::new_v4().to_string();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO assessments
                 (id, repository_url, outcome, verdict, started_at, finished_at, config_keys)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                &id,
                &session.repository_url,
                session.outcome.as_str(),
                session.verdict.map(Verdict::as_str),
                session.started_at.timestamp(),
                session.finished_at.timestamp(),
                session.config_keys as i64,
            ],
        )?;
        tx.commit()?;
        Ok::<_, rusqlite::Error>(id)
    })
    .await
}

/// Returns up to `limit` records, most recently finished first.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn recent_assessments(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<AssessmentRecord>, tokio_rusqlite::Error> {
    let limit = limit as i64;
    conn.call(move |db| {
        let mut stmt = db.prepare(
            "SELECT id, repository_url, outcome, verdict, started_at, finished_at, config_keys
             FROM assessments
             ORDER BY finished_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![limit], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok::<_, rusqlite::Error>(rows)
    })
    .await
}

/// Returns the most recent record for `repository_url`, if any.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn latest_for_repository(
    conn: &Connection,
    repository_url: &str,
) -> Result<Option<AssessmentRecord>, tokio_rusqlite::Error> {
    let repository_url = repository_url.to_owned();
    conn.call(move |db| {
        let record = db
            .query_row(
                "SELECT id, repository_url, outcome, verdict, started_at, finished_at, config_keys
                 FROM assessments
                 WHERE repository_url = ?1
                 ORDER BY finished_at DESC, rowid DESC
                 LIMIT 1",
                rusqlite::params![&repository_url],
                row_to_record,
            )
            .optional()?;
        Ok::<_, rusqlite::Error>(record)
    })
    .await
}
