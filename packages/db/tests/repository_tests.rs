#![allow(clippy::disallowed_methods)]

mod common;

use lens_core::{Job, JobId, JobState, Priority};
use serde_json::json;
use std::error::Error;

use db::DbError;
use db::repositories::{JobRepository, QueueRepository, UNKNOWN_FAILURE_GROUP};

fn job(jid: &str, queue: &str) -> Job {
    Job::new(queue, json!({"jid": jid})).with_jid(jid)
}

fn ids(values: &[&str]) -> Vec<JobId> {
    values.iter().map(|v| JobId::from(*v)).collect()
}

async fn reset_db() -> Result<(), DbError> {
    let db_conn = db::get_db()?;
    db_conn.query("DELETE job; DELETE queue;").await?;
    Ok(())
}

#[tokio::test]
async fn test_repositories() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_db().await?;

    // JobRepository: put/get/get_many, queues are registered on first use
    let stored = JobRepository::put(
        &job("a", "ingest")
            .with_priority(Priority::High)
            .with_tags(vec!["nightly".to_string()]),
    )
    .await?;
    assert_eq!(stored.jid, JobId::from("a"));
    assert_eq!(stored.state, JobState::Waiting);

    let loaded = JobRepository::get(&JobId::from("a")).await?;
    assert_eq!(loaded.priority, Priority::High);
    assert_eq!(loaded.data, json!({"jid": "a"}));
    assert_eq!(loaded.tags, vec!["nightly".to_string()]);

    let b = JobRepository::put(&job("b", "ingest").with_dependencies(ids(&["a"]))).await?;
    assert_eq!(b.state, JobState::Depends);

    let a = JobRepository::get(&JobId::from("a")).await?;
    assert_eq!(a.dependents, ids(&["b"]));

    let many = JobRepository::get_many(&ids(&["b", "missing", "a"])).await?;
    let order: Vec<&str> = many.iter().map(|j| j.jid.as_str()).collect();
    assert_eq!(order, vec!["b", "a"]);

    let missing = JobRepository::get(&JobId::from("missing")).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    let dangling = JobRepository::put(&job("c", "ingest").with_dependencies(ids(&["nope"]))).await;
    assert!(matches!(dangling, Err(DbError::NotFound(_))));

    assert_eq!(QueueRepository::names().await?, vec!["ingest".to_string()]);

    // JobRepository: cancel refuses to strand a dependent
    let refused = JobRepository::cancel(&ids(&["a"])).await;
    assert!(matches!(refused, Err(DbError::Conflict(_))));
    assert!(JobRepository::exists(&JobId::from("a")).await?);

    let cancelled = JobRepository::cancel(&ids(&["b"])).await?;
    assert_eq!(cancelled, ids(&["b"]));
    let a = JobRepository::get(&JobId::from("a")).await?;
    assert!(a.dependents.is_empty());

    let cancelled = JobRepository::cancel(&ids(&["a", "unknown"])).await?;
    assert_eq!(cancelled, ids(&["a"]));

    // JobRepository: both ends of a chain can go in one request
    reset_db().await?;
    JobRepository::put(&job("x", "chain")).await?;
    JobRepository::put(&job("y", "chain").with_dependencies(ids(&["x"]))).await?;
    let cancelled = JobRepository::cancel(&ids(&["x", "y"])).await?;
    assert_eq!(cancelled.len(), 2);
    assert!(JobRepository::get_many(&ids(&["x", "y"])).await?.is_empty());

    // JobRepository: depend/undepend keep both sides of an edge
    reset_db().await?;
    for jid in ["p", "q", "r"] {
        JobRepository::put(&job(jid, "edges")).await?;
    }

    let q = JobRepository::depend(&JobId::from("q"), &ids(&["p"])).await?;
    assert_eq!(q.dependencies, ids(&["p"]));
    assert_eq!(q.state, JobState::Depends);
    let r = JobRepository::depend(&JobId::from("r"), &ids(&["q"])).await?;
    assert_eq!(r.dependencies, ids(&["q"]));

    let p = JobRepository::get(&JobId::from("p")).await?;
    assert_eq!(p.dependents, ids(&["q"]));

    let cycle = JobRepository::depend(&JobId::from("p"), &ids(&["r"])).await;
    assert!(matches!(cycle, Err(DbError::Conflict(_))));
    let own = JobRepository::depend(&JobId::from("p"), &ids(&["p"])).await;
    assert!(matches!(own, Err(DbError::Conflict(_))));
    let unknown = JobRepository::depend(&JobId::from("p"), &ids(&["zzz"])).await;
    assert!(matches!(unknown, Err(DbError::NotFound(_))));

    let q = JobRepository::undepend(&JobId::from("q"), &[]).await?;
    assert!(q.dependencies.is_empty());
    assert_eq!(q.state, JobState::Waiting);
    let p = JobRepository::get(&JobId::from("p")).await?;
    assert!(p.dependents.is_empty());

    // Without the q -> p edge, p may now wait on r.
    let p = JobRepository::depend(&JobId::from("p"), &ids(&["r"])).await?;
    assert_eq!(p.dependencies, ids(&["r"]));

    // JobRepository: move and priority
    let moved = JobRepository::move_to(&JobId::from("q"), "elsewhere").await?;
    assert_eq!(moved.queue_name, "elsewhere");
    assert_eq!(moved.state, JobState::Waiting);
    assert!(QueueRepository::names().await?.contains(&"elsewhere".to_string()));

    let bumped = JobRepository::set_priority(&JobId::from("q"), Priority::Critical).await?;
    assert_eq!(bumped.priority, Priority::Critical);

    let missing = JobRepository::set_priority(&JobId::from("gone"), Priority::Low).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    // QueueRepository: counts and pausing
    reset_db().await?;
    JobRepository::put(&job("w1", "mail")).await?;
    JobRepository::put(&job("w2", "mail")).await?;
    JobRepository::put(&job("d1", "mail").with_dependencies(ids(&["w1"]))).await?;
    let mut failed = job("f1", "reports");
    failed.state = JobState::Failed;
    JobRepository::put(&failed).await?;

    let mail = QueueRepository::counts_for("mail").await?;
    assert_eq!(mail.waiting, 2);
    assert_eq!(mail.depends, 1);
    assert_eq!(mail.failed, 0);
    assert!(!mail.paused);

    let all = QueueRepository::counts().await?;
    let names: Vec<&str> = all.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, vec!["mail", "reports"]);
    assert_eq!(all[1].failed, 1);

    let paused = QueueRepository::set_paused("mail", true).await?;
    assert!(paused.paused);
    assert_eq!(paused.waiting, 2);
    assert!(QueueRepository::counts_for("mail").await?.paused);
    assert!(!QueueRepository::set_paused("mail", false).await?.paused);

    let unknown = QueueRepository::counts_for("nowhere").await;
    assert!(matches!(unknown, Err(DbError::NotFound(_))));
    let unknown = QueueRepository::set_paused("nowhere", true).await;
    assert!(matches!(unknown, Err(DbError::NotFound(_))));

    // QueueRepository: stats count finished jobs too
    let mut done = job("c1", "mail").with_priority(Priority::High);
    done.state = JobState::Complete;
    JobRepository::put(&done).await?;

    let stats = QueueRepository::stats("mail").await?;
    assert_eq!(stats.total, 4);
    assert_eq!(stats.complete, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.pending_by_priority.get(&Priority::Normal), Some(&3));
    assert_eq!(stats.pending_by_priority.get(&Priority::High), None);
    assert!(matches!(
        QueueRepository::stats("nowhere").await,
        Err(DbError::NotFound(_))
    ));

    // JobRepository: paged listings per queue and state
    let waiting = JobRepository::in_queue("mail", JobState::Waiting, 0, 1).await?;
    assert_eq!(waiting.total, 2);
    assert_eq!(waiting.jobs.len(), 1);
    let rest = JobRepository::in_queue("mail", JobState::Waiting, 1, 10).await?;
    assert_eq!(rest.jobs.len(), 1);
    assert_ne!(rest.jobs[0].jid, waiting.jobs[0].jid);

    let none = JobRepository::in_queue("mail", JobState::Running, 0, 10).await?;
    assert_eq!(none.total, 0);
    assert!(none.jobs.is_empty());

    let completed = JobRepository::completed(0, 10).await?;
    assert_eq!(completed.total, 1);
    assert_eq!(completed.jobs[0].jid, JobId::from("c1"));

    // JobRepository: tags
    let tags = ["urgent".to_string(), "eu".to_string()];
    let tags = JobRepository::tag(&JobId::from("w1"), &tags).await?;
    assert_eq!(tags.len(), 2);
    JobRepository::tag(&JobId::from("w2"), &["eu".to_string()]).await?;

    assert_eq!(
        JobRepository::tags().await?,
        vec!["eu".to_string(), "urgent".to_string()]
    );

    let tagged = JobRepository::tagged("eu", 0, 10).await?;
    assert_eq!(tagged.total, 2);

    let tags = JobRepository::untag(&JobId::from("w1"), &["urgent".to_string()]).await?;
    assert_eq!(tags, vec!["eu".to_string()]);
    assert_eq!(JobRepository::tagged("urgent", 0, 10).await?.total, 0);

    let missing = JobRepository::tag(&JobId::from("gone"), &["x".to_string()]).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    // JobRepository: failure groups
    reset_db().await?;
    JobRepository::put(&job("e1", "mail").with_failure("mail-Timeout", "timed out")).await?;
    JobRepository::put(&job("e2", "mail").with_failure("mail-Timeout", "timed out")).await?;
    JobRepository::put(&job("e3", "reports").with_failure("reports-Crash", "boom")).await?;
    let mut bare = job("e4", "reports");
    bare.state = JobState::Failed;
    JobRepository::put(&bare).await?;

    let groups = JobRepository::failed_groups().await?;
    assert_eq!(groups.get("mail-Timeout"), Some(&2));
    assert_eq!(groups.get("reports-Crash"), Some(&1));
    assert_eq!(groups.get(UNKNOWN_FAILURE_GROUP), Some(&1));

    let page = JobRepository::failed("mail-Timeout", 0, 10).await?;
    assert_eq!(page.total, 2);
    assert!(page.jobs.iter().all(|j| j.failure.is_some()));
    assert_eq!(JobRepository::failed(UNKNOWN_FAILURE_GROUP, 0, 10).await?.total, 1);

    // Moving a failed job back clears its failure.
    let retried = JobRepository::move_to(&JobId::from("e1"), "mail").await?;
    assert_eq!(retried.state, JobState::Waiting);
    assert!(retried.failure.is_none());
    assert_eq!(JobRepository::failed("mail-Timeout", 0, 10).await?.total, 1);

    Ok(())
}
