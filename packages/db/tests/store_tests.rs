#![allow(clippy::disallowed_methods)]

mod common;

use lens_core::{DependencyGraph, DependencyNode, Job, JobId, JobStore, ResolveError, fetch_job};
use serde_json::json;
use std::error::Error;

use db::{DbError, SurrealJobStore, repositories::JobRepository};

fn job(jid: &str, deps: &[&str]) -> Job {
    Job::new("ingest", json!({}))
        .with_jid(jid)
        .with_dependencies(deps.iter().map(|d| JobId::from(*d)).collect())
}

#[tokio::test]
async fn test_resolvers_over_surreal_store() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_db().await?;

    //   a
    //  / \
    // b   c
    //  \ /
    //   d
    JobRepository::put(&job("a", &[])).await?;
    JobRepository::put(&job("b", &["a"])).await?;
    JobRepository::put(&job("c", &["a"])).await?;
    JobRepository::put(&job("d", &["b", "c"])).await?;

    let store = SurrealJobStore;
    let fetched = store.get_jobs(&[JobId::from("d"), JobId::from("zz")]).await?;
    assert_eq!(fetched.len(), 1);

    let missing = fetch_job(&store, &JobId::from("zz")).await;
    assert!(matches!(missing, Err(ResolveError::NotFound(_))));

    let graph = DependencyGraph::new(&store);

    let roots = graph.root_jobs(&JobId::from("d")).await?;
    assert_eq!(roots.into_iter().collect::<Vec<_>>(), vec![JobId::from("a")]);

    let tree = graph.dependency_tree(&JobId::from("c")).await?;
    assert_eq!(tree.len(), 1);
    let DependencyNode::Branch { label, children } = &tree[0] else {
        panic!("expected a branch, got {:?}", tree[0]);
    };
    assert_eq!(label, "ain ingest");
    assert_eq!(children.len(), 2);

    assert!(graph.safe_cancel_closure(&JobId::from("a")).await?.is_empty());

    let closure = graph.safe_cancel_closure(&JobId::from("d")).await?;
    let closure: Vec<&str> = closure.iter().map(|j| j.as_str()).collect();
    assert_eq!(closure, vec!["d", "b", "c", "a"]);

    let ids: Vec<JobId> = closure.iter().map(|j| JobId::from(*j)).collect();

    // A dependent added after the closure was computed blocks the whole cancel.
    JobRepository::put(&job("late", &["d"])).await?;
    let blocked = JobRepository::cancel(&ids).await;
    assert!(matches!(blocked, Err(DbError::Conflict(_))));
    assert_eq!(JobRepository::get_many(&ids).await?.len(), 4);
    let d = JobRepository::get(&JobId::from("d")).await?;
    assert_eq!(d.dependents, vec![JobId::from("late")]);

    // Without it, the closure is exactly what the store accepts in one cancel.
    JobRepository::cancel(&[JobId::from("late")]).await?;
    let cancelled = JobRepository::cancel(&ids).await?;
    assert_eq!(cancelled.len(), 4);
    assert!(JobRepository::get_many(&ids).await?.is_empty());

    Ok(())
}
