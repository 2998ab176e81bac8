//! History database schema and its forward-only migrations.

/// Version bookkeeping table, created before anything else on every open.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// v1: one `assessments` row per finished analysis session, keyed by UUID v4
/// text. Only the number of configuration keys is stored; values and
/// credentials never reach the database.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS assessments (
        id             TEXT    PRIMARY KEY,
        repository_url TEXT    NOT NULL,
        outcome        TEXT    NOT NULL CHECK(outcome IN ('completed', 'failed')),
        verdict        TEXT             CHECK(verdict IN ('yes', 'no', 'unknown')),
        started_at     INTEGER NOT NULL,
        finished_at    INTEGER NOT NULL,
        config_keys    INTEGER NOT NULL DEFAULT 0
    ) STRICT;

    CREATE INDEX IF NOT EXISTS assessments_by_repository
        ON assessments (repository_url, finished_at DESC);
";

/// Migration scripts in order; entry `i` brings the schema to version `i + 1`.
const MIGRATIONS: &[&str] = &[SCHEMA_V1_SQL];

/// Latest schema version this build knows.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

/// Brings the database up to [`SCHEMA_VERSION`]. Each step runs in its own
/// immediate transaction together with its version row.
///
/// # Errors
///
/// Returns `rusqlite::Error` if any DDL fails.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let current: i64 = db
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0);

    for (target, script) in (1..).zip(MIGRATIONS).skip_while(|(target, _)| *target <= current) {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(script)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])?;
        tx.commit()?;
        tracing::info!(version = target, "history schema migrated");
    }
    Ok(())
}
