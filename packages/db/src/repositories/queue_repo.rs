//! Queue repository: queue registry and per-state job counts.

use std::collections::BTreeMap;

use lens_core::{JobState, Priority, QueueCounts, QueueStats};
use serde::{Deserialize, Serialize};

use crate::{DbError, get_db};

/// Repository for queue persistence operations.
pub struct QueueRepository;

/// Internal record type for SurrealDB reads.
#[derive(Debug, Deserialize)]
struct QueueRecord {
    name: String,
    #[serde(default)]
    paused: bool,
}

/// Omits `created_at` so SurrealDB fills in its default.
#[derive(Debug, Clone, Serialize)]
struct QueueCreate {
    name: String,
    paused: bool,
}

#[derive(Debug, Deserialize)]
struct StateCount {
    queue_name: String,
    state: JobState,
    count: i64,
}

impl QueueRepository {
    /// Register a queue if it is not known yet.
    pub async fn ensure(name: &str) -> Result<(), DbError> {
        let db = get_db()?;

        let existing: Option<QueueRecord> = db.select(("queue", name.to_string())).await?;
        if existing.is_some() {
            return Ok(());
        }

        let create_data = QueueCreate {
            name: name.to_string(),
            paused: false,
        };
        let _: Option<QueueRecord> = db
            .create(("queue", name.to_string()))
            .content(create_data)
            .await?;

        tracing::info!("Registered queue '{}'", name);
        Ok(())
    }

    /// Names of all known queues, sorted.
    pub async fn names() -> Result<Vec<String>, DbError> {
        let db = get_db()?;

        let mut result = db.query("SELECT name FROM queue ORDER BY name").await?;

        #[derive(Deserialize)]
        struct NameRow {
            name: String,
        }

        let rows: Vec<NameRow> = result.take(0)?;

        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    /// Counts for every queue, sorted by name.
    pub async fn counts() -> Result<Vec<QueueCounts>, DbError> {
        let db = get_db()?;

        let queues: Vec<QueueRecord> = db.select("queue").await?;
        let mut by_name: BTreeMap<String, QueueCounts> = queues
            .into_iter()
            .map(|q| {
                let mut counts = QueueCounts::new(q.name.clone());
                counts.paused = q.paused;
                (q.name, counts)
            })
            .collect();

        let mut result = db
            .query("SELECT queue_name, state, count() AS count FROM job GROUP BY queue_name, state")
            .await?;

        let rows: Vec<StateCount> = result.take(0)?;
        for row in rows {
            by_name
                .entry(row.queue_name.clone())
                .or_insert_with(|| QueueCounts::new(row.queue_name))
                .record(row.state, row.count.max(0) as u64);
        }

        Ok(by_name.into_values().collect())
    }

    /// Counts for one queue.
    pub async fn counts_for(name: &str) -> Result<QueueCounts, DbError> {
        let db = get_db()?;

        let queue: Option<QueueRecord> = db.select(("queue", name.to_string())).await?;
        let queue = queue.ok_or_else(|| DbError::NotFound(format!("Queue not found: {}", name)))?;

        let mut counts = QueueCounts::new(queue.name);
        counts.paused = queue.paused;

        let mut result = db
            .query(
                r#"
                SELECT queue_name, state, count() AS count
                FROM job
                WHERE queue_name = $name
                GROUP BY queue_name, state
                "#,
            )
            .bind(("name", name.to_string()))
            .await?;

        let rows: Vec<StateCount> = result.take(0)?;
        for row in rows {
            counts.record(row.state, row.count.max(0) as u64);
        }

        Ok(counts)
    }

    /// Totals for one queue, finished jobs included.
    pub async fn stats(name: &str) -> Result<QueueStats, DbError> {
        let db = get_db()?;

        let queue: Option<QueueRecord> = db.select(("queue", name.to_string())).await?;
        let queue = queue.ok_or_else(|| DbError::NotFound(format!("Queue not found: {}", name)))?;

        let mut result = db
            .query(
                r#"
                SELECT priority, state, count() AS count
                FROM job
                WHERE queue_name = $name
                GROUP BY priority, state
                "#,
            )
            .bind(("name", name.to_string()))
            .await?;

        #[derive(Deserialize)]
        struct PriorityCount {
            priority: Priority,
            state: JobState,
            count: i64,
        }

        let rows: Vec<PriorityCount> = result.take(0)?;
        let mut stats = QueueStats::new(queue.name);
        for row in rows {
            stats.record(row.priority, row.state, row.count.max(0) as u64);
        }

        Ok(stats)
    }

    /// Pause or unpause a queue.
    pub async fn set_paused(name: &str, paused: bool) -> Result<QueueCounts, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("UPDATE type::thing('queue', $name) SET paused = $paused RETURN AFTER")
            .bind(("name", name.to_string()))
            .bind(("paused", paused))
            .await?;

        let records: Vec<QueueRecord> = result.take(0)?;
        if records.is_empty() {
            return Err(DbError::NotFound(format!("Queue not found: {}", name)));
        }

        tracing::info!("Queue '{}' paused={}", name, paused);
        Self::counts_for(name).await
    }
}
