//! Database schema definitions using SurrealQL.

use crate::{DbError, get_db};

/// Initialize the database schema.
///
/// This creates all necessary tables, fields, and indexes.
pub async fn init_schema() -> Result<(), DbError> {
    let db = get_db()?;

    tracing::info!("Initializing database schema...");

    db.query(QUEUE_SCHEMA).await?.check()?;
    db.query(JOB_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Queue table schema. Queues are keyed by name.
const QUEUE_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS queue SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS name ON queue TYPE string;
DEFINE FIELD IF NOT EXISTS paused ON queue TYPE bool DEFAULT false;
DEFINE FIELD IF NOT EXISTS created_at ON queue TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS queue_name ON queue FIELDS name UNIQUE;
"#;

/// Job table schema.
const JOB_SCHEMA: &str = r#"
-- Payloads are arbitrary JSON, so extra fields are allowed
DEFINE TABLE IF NOT EXISTS job SCHEMALESS;

DEFINE FIELD IF NOT EXISTS jid ON job TYPE string;
DEFINE FIELD IF NOT EXISTS queue_name ON job TYPE string;
DEFINE FIELD IF NOT EXISTS priority ON job TYPE string DEFAULT "normal";
DEFINE FIELD IF NOT EXISTS state ON job TYPE string DEFAULT "waiting";
DEFINE FIELD IF NOT EXISTS dependencies ON job TYPE array<string> DEFAULT [];
DEFINE FIELD IF NOT EXISTS dependents ON job TYPE array<string> DEFAULT [];
DEFINE FIELD IF NOT EXISTS tags ON job TYPE array<string> DEFAULT [];
DEFINE FIELD IF NOT EXISTS created_at ON job TYPE string;

DEFINE INDEX IF NOT EXISTS job_jid ON job FIELDS jid UNIQUE;
DEFINE INDEX IF NOT EXISTS job_queue ON job FIELDS queue_name;

-- Compound index for per-queue state counts
DEFINE INDEX IF NOT EXISTS job_queue_state ON job FIELDS queue_name, state;
"#;
