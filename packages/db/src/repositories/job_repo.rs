//! Job repository: records plus the dependency edges between them.
//!
//! Every edge is stored twice, as a `dependencies` entry on the dependent
//! and a `dependents` entry on the dependency. All writes here keep the two
//! sides in step.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use lens_core::{Job, JobId, JobPage, JobState, Priority};
use surrealdb::Response;

use super::QueueRepository;
use crate::{DbError, get_db};

/// Repository for job persistence operations.
pub struct JobRepository;

fn not_found(jid: &JobId) -> DbError {
    DbError::NotFound(format!("Job not found: {}", jid))
}

fn stranded(jid: &JobId, dependent: &JobId) -> DbError {
    DbError::Conflict(format!("Job {} is still needed by {}", jid, dependent))
}

/// Thrown inside [`CANCEL_QUERY`] when a job to delete has an outside dependent.
const STRANDED_MARKER: &str = "cancel would strand a dependent";

/// Re-checks dependents, scrubs the cancelled ids from surviving
/// dependencies and deletes the jobs in one transaction.
const CANCEL_QUERY: &str = r#"
BEGIN TRANSACTION;
LET $blocked = (SELECT VALUE jid FROM job WHERE jid IN $jids AND array::len(array::complement(dependents, $jids)) > 0);
IF array::len($blocked) > 0 {
    THROW "cancel would strand a dependent";
};
UPDATE job SET dependents = array::complement(dependents, $jids)
    WHERE jid NOTINSIDE $jids AND array::len(array::intersect(dependents, $jids)) > 0;
DELETE job WHERE jid IN $jids;
COMMIT TRANSACTION;
"#;

/// Bucket for failed jobs that carry no failure details.
pub const UNKNOWN_FAILURE_GROUP: &str = "unknown";

/// Read a count statement followed by a page statement.
fn page(mut response: Response) -> Result<JobPage, DbError> {
    let total: Option<i64> = response.take((0, "count"))?;
    let jobs: Vec<Job> = response.take(1)?;

    Ok(JobPage {
        total: total.unwrap_or(0).max(0) as u64,
        jobs,
    })
}

fn as_strings(jids: &[JobId]) -> Vec<String> {
    jids.iter().map(|j| j.to_string()).collect()
}

/// State a job should hold given its remaining dependencies.
fn settled_state(current: JobState, has_dependencies: bool) -> JobState {
    match (current, has_dependencies) {
        (JobState::Waiting, true) => JobState::Depends,
        (JobState::Depends, false) => JobState::Waiting,
        (state, _) => state,
    }
}

impl JobRepository {
    /// Store a new job and link it to its dependencies.
    ///
    /// A freshly stored job has no dependents yet; any given are dropped.
    pub async fn put(job: &Job) -> Result<Job, DbError> {
        let db = get_db()?;

        for dependency in &job.dependencies {
            if !Self::exists(dependency).await? {
                return Err(not_found(dependency));
            }
        }

        QueueRepository::ensure(&job.queue_name).await?;

        let mut record = job.clone();
        record.dependents.clear();
        record.state = settled_state(record.state, !record.dependencies.is_empty());

        let created: Option<Job> = db
            .create(("job", record.jid.to_string()))
            .content(record)
            .await?;
        let created = created.ok_or_else(|| DbError::Query("Failed to create job".into()))?;

        for dependency in &created.dependencies {
            Self::add_dependents(dependency, &[created.jid.clone()]).await?;
        }

        tracing::debug!(jid = %created.jid, queue = %created.queue_name, "Stored job");
        Ok(created)
    }

    /// Get a job by ID.
    pub async fn get(jid: &JobId) -> Result<Job, DbError> {
        let db = get_db()?;

        let record: Option<Job> = db.select(("job", jid.to_string())).await?;

        record.ok_or_else(|| not_found(jid))
    }

    /// Get several jobs in request order, skipping unknown ids.
    pub async fn get_many(jids: &[JobId]) -> Result<Vec<Job>, DbError> {
        if jids.is_empty() {
            return Ok(Vec::new());
        }

        let db = get_db()?;

        let mut result = db
            .query("SELECT * FROM job WHERE jid IN $jids")
            .bind(("jids", as_strings(jids)))
            .await?;

        let records: Vec<Job> = result.take(0)?;
        let mut by_id: HashMap<JobId, Job> = records
            .into_iter()
            .map(|job| (job.jid.clone(), job))
            .collect();

        Ok(jids
            .iter()
            .filter_map(|jid| by_id.remove(jid))
            .collect())
    }

    /// Check if a job exists.
    pub async fn exists(jid: &JobId) -> Result<bool, DbError> {
        let db = get_db()?;

        let record: Option<Job> = db.select(("job", jid.to_string())).await?;

        Ok(record.is_some())
    }

    /// Delete a set of jobs, returning the ids actually removed.
    ///
    /// Refuses with `Conflict` if any of them still has a dependent that is
    /// not part of the same request. Unknown ids are ignored. The check, the
    /// edge scrub and the deletes commit together or not at all.
    pub async fn cancel(jids: &[JobId]) -> Result<Vec<JobId>, DbError> {
        let db = get_db()?;

        let jobs = Self::get_many(jids).await?;
        let cancelling: HashSet<&JobId> = jobs.iter().map(|job| &job.jid).collect();

        for job in &jobs {
            if let Some(dependent) = job.dependents.iter().find(|d| !cancelling.contains(d)) {
                return Err(stranded(&job.jid, dependent));
            }
        }

        let cancelled: Vec<JobId> = jobs.into_iter().map(|job| job.jid).collect();
        if cancelled.is_empty() {
            return Ok(cancelled);
        }

        let mut response = db
            .query(CANCEL_QUERY)
            .bind(("jids", as_strings(&cancelled)))
            .await?;

        let errors = response.take_errors();
        if errors.values().any(|err| err.to_string().contains(STRANDED_MARKER)) {
            // A dependent was added after the jobs were read.
            let jobs = Self::get_many(&cancelled).await?;
            let blocked = jobs.iter().find_map(|job| {
                job.dependents
                    .iter()
                    .find(|d| !cancelled.contains(d))
                    .map(|dependent| stranded(&job.jid, dependent))
            });
            return Err(blocked.unwrap_or_else(|| {
                DbError::Conflict("Cancelled jobs gained a dependent".to_string())
            }));
        }
        if let Some(err) = errors.into_values().next() {
            return Err(err.into());
        }

        tracing::info!(count = cancelled.len(), "Cancelled jobs");
        Ok(cancelled)
    }

    /// Move a job to `queue`, making it eligible to run there again.
    pub async fn move_to(jid: &JobId, queue: &str) -> Result<Job, DbError> {
        let db = get_db()?;

        let job = Self::get(jid).await?;
        QueueRepository::ensure(queue).await?;

        let state = if job.dependencies.is_empty() {
            JobState::Waiting
        } else {
            JobState::Depends
        };

        let mut result = db
            .query("UPDATE type::thing('job', $jid) SET queue_name = $queue, state = $state, failure = NONE RETURN AFTER")
            .bind(("jid", jid.to_string()))
            .bind(("queue", queue.to_string()))
            .bind(("state", state))
            .await?;

        let records: Vec<Job> = result.take(0)?;

        records.into_iter().next().ok_or_else(|| not_found(jid))
    }

    /// Update a job's priority.
    pub async fn set_priority(jid: &JobId, priority: Priority) -> Result<Job, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("UPDATE type::thing('job', $jid) SET priority = $priority RETURN AFTER")
            .bind(("jid", jid.to_string()))
            .bind(("priority", priority))
            .await?;

        let records: Vec<Job> = result.take(0)?;

        records.into_iter().next().ok_or_else(|| not_found(jid))
    }

    /// Make `jid` wait on each of `dependencies`.
    ///
    /// Rejects self-edges, unknown ids and any edge that would close a cycle.
    pub async fn depend(jid: &JobId, dependencies: &[JobId]) -> Result<Job, DbError> {
        let job = Self::get(jid).await?;

        for dependency in dependencies {
            if dependency == jid {
                return Err(DbError::Conflict(format!("Job {} cannot depend on itself", jid)));
            }
            if !Self::exists(dependency).await? {
                return Err(not_found(dependency));
            }
            if Self::reaches(dependency, jid).await? {
                return Err(DbError::Conflict(format!(
                    "Job {} already depends on {}",
                    dependency, jid
                )));
            }
        }

        let mut merged = job.dependencies.clone();
        for dependency in dependencies {
            if !merged.contains(dependency) {
                merged.push(dependency.clone());
            }
        }

        for dependency in dependencies {
            Self::add_dependents(dependency, &[jid.clone()]).await?;
        }

        let state = settled_state(job.state, !merged.is_empty());
        Self::write_dependencies(jid, merged, state).await
    }

    /// Drop edges from `jid` to `dependencies`; an empty list drops all.
    pub async fn undepend(jid: &JobId, dependencies: &[JobId]) -> Result<Job, DbError> {
        let job = Self::get(jid).await?;

        let removing: Vec<JobId> = if dependencies.is_empty() {
            job.dependencies.clone()
        } else {
            dependencies.to_vec()
        };

        for dependency in &removing {
            Self::remove_dependents(dependency, &[jid.clone()]).await?;
        }

        let remaining: Vec<JobId> = job
            .dependencies
            .into_iter()
            .filter(|d| !removing.contains(d))
            .collect();

        let state = settled_state(job.state, !remaining.is_empty());
        Self::write_dependencies(jid, remaining, state).await
    }

    /// Add tags to a job, returning its tags afterwards.
    pub async fn tag(jid: &JobId, tags: &[String]) -> Result<Vec<String>, DbError> {
        Self::update_tags(jid, "array::union(tags, $tags)", tags).await
    }

    /// Remove tags from a job, returning its tags afterwards.
    pub async fn untag(jid: &JobId, tags: &[String]) -> Result<Vec<String>, DbError> {
        Self::update_tags(jid, "array::complement(tags, $tags)", tags).await
    }

    /// Every tag in use, sorted.
    pub async fn tags() -> Result<Vec<String>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT VALUE tags FROM job WHERE array::len(tags) > 0")
            .await?;

        let rows: Vec<Vec<String>> = result.take(0)?;
        let tags: BTreeSet<String> = rows.into_iter().flatten().collect();

        Ok(tags.into_iter().collect())
    }

    /// Jobs carrying `tag`, oldest first.
    pub async fn tagged(tag: &str, start: u64, limit: u64) -> Result<JobPage, DbError> {
        let db = get_db()?;

        let response = db
            .query(
                r#"
                SELECT count() AS count FROM job WHERE tags CONTAINS $tag GROUP ALL;
                SELECT * FROM job WHERE tags CONTAINS $tag
                    ORDER BY created_at ASC, jid ASC LIMIT $limit START $start;
                "#,
            )
            .bind(("tag", tag.to_string()))
            .bind(("start", start))
            .bind(("limit", limit))
            .await?;

        page(response)
    }

    /// Jobs of one queue in one state, oldest first.
    pub async fn in_queue(
        queue: &str,
        state: JobState,
        start: u64,
        limit: u64,
    ) -> Result<JobPage, DbError> {
        let db = get_db()?;

        let response = db
            .query(
                r#"
                SELECT count() AS count FROM job
                    WHERE queue_name = $queue AND state = $state GROUP ALL;
                SELECT * FROM job WHERE queue_name = $queue AND state = $state
                    ORDER BY created_at ASC, jid ASC LIMIT $limit START $start;
                "#,
            )
            .bind(("queue", queue.to_string()))
            .bind(("state", state))
            .bind(("start", start))
            .bind(("limit", limit))
            .await?;

        page(response)
    }

    /// Number of failed jobs per failure group.
    pub async fn failed_groups() -> Result<BTreeMap<String, u64>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT VALUE failure.group FROM job WHERE state = 'failed'")
            .await?;

        let rows: Vec<Option<String>> = result.take(0)?;
        let mut groups = BTreeMap::new();
        for group in rows {
            let group = group.unwrap_or_else(|| UNKNOWN_FAILURE_GROUP.to_string());
            *groups.entry(group).or_insert(0) += 1;
        }

        Ok(groups)
    }

    /// Failed jobs of one failure group, oldest first.
    pub async fn failed(group: &str, start: u64, limit: u64) -> Result<JobPage, DbError> {
        let db = get_db()?;

        let condition = if group == UNKNOWN_FAILURE_GROUP {
            "state = 'failed' AND (failure.group = $group OR failure IS NONE)"
        } else {
            "state = 'failed' AND failure.group = $group"
        };

        let response = db
            .query(format!(
                r#"
                SELECT count() AS count FROM job WHERE {condition} GROUP ALL;
                SELECT * FROM job WHERE {condition}
                    ORDER BY created_at ASC, jid ASC LIMIT $limit START $start;
                "#
            ))
            .bind(("group", group.to_string()))
            .bind(("start", start))
            .bind(("limit", limit))
            .await?;

        page(response)
    }

    /// Completed jobs, newest first.
    pub async fn completed(start: u64, limit: u64) -> Result<JobPage, DbError> {
        let db = get_db()?;

        let response = db
            .query(
                r#"
                SELECT count() AS count FROM job WHERE state = 'complete' GROUP ALL;
                SELECT * FROM job WHERE state = 'complete'
                    ORDER BY created_at DESC, jid ASC LIMIT $limit START $start;
                "#,
            )
            .bind(("start", start))
            .bind(("limit", limit))
            .await?;

        page(response)
    }

    async fn update_tags(
        jid: &JobId,
        expression: &str,
        tags: &[String],
    ) -> Result<Vec<String>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query(format!(
                "UPDATE type::thing('job', $jid) SET tags = {expression} RETURN AFTER"
            ))
            .bind(("jid", jid.to_string()))
            .bind(("tags", tags.to_vec()))
            .await?;

        let records: Vec<Job> = result.take(0)?;
        let job = records.into_iter().next().ok_or_else(|| not_found(jid))?;

        Ok(job.tags)
    }

    /// Whether `target` is reachable from `from` by following dependencies.
    async fn reaches(from: &JobId, target: &JobId) -> Result<bool, DbError> {
        let mut seen: HashSet<JobId> = HashSet::new();
        let mut pending = vec![from.clone()];

        while let Some(jid) = pending.pop() {
            if &jid == target {
                return Ok(true);
            }
            if !seen.insert(jid.clone()) {
                continue;
            }
            if let Some(job) = Self::get_many(&[jid]).await?.into_iter().next() {
                pending.extend(job.dependencies);
            }
        }

        Ok(false)
    }

    async fn write_dependencies(
        jid: &JobId,
        dependencies: Vec<JobId>,
        state: JobState,
    ) -> Result<Job, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("UPDATE type::thing('job', $jid) SET dependencies = $dependencies, state = $state RETURN AFTER")
            .bind(("jid", jid.to_string()))
            .bind(("dependencies", as_strings(&dependencies)))
            .bind(("state", state))
            .await?;

        let records: Vec<Job> = result.take(0)?;

        records.into_iter().next().ok_or_else(|| not_found(jid))
    }

    async fn add_dependents(jid: &JobId, dependents: &[JobId]) -> Result<(), DbError> {
        let db = get_db()?;

        db.query("UPDATE type::thing('job', $jid) SET dependents = array::union(dependents, $dependents)")
            .bind(("jid", jid.to_string()))
            .bind(("dependents", as_strings(dependents)))
            .await?
            .check()?;

        Ok(())
    }

    async fn remove_dependents(jid: &JobId, dependents: &[JobId]) -> Result<(), DbError> {
        let db = get_db()?;

        db.query("UPDATE type::thing('job', $jid) SET dependents = array::complement(dependents, $dependents)")
            .bind(("jid", jid.to_string()))
            .bind(("dependents", as_strings(dependents)))
            .await?
            .check()?;

        Ok(())
    }
}
