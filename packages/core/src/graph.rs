//! Dependency graph resolution over the store's job records.
//!
//! Edges point from a dependent to its dependency. Walking `dependencies`
//! goes up towards the roots, walking `dependents` goes down towards the
//! leaves. Every lookup goes through the [`JobStore`]; a missing id aborts
//! the whole computation with [`ResolveError::NotFound`].

use std::collections::{BTreeSet, HashSet};

use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::store::fetch_job;
use crate::{Job, JobId, JobStore, ResolveError};

/// A node of a dependency tree, built downward through `dependents`.
///
/// Leaves serialize as their bare label, branches as `{label, children}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DependencyNode {
    Leaf(String),
    Branch {
        label: String,
        children: Vec<DependencyNode>,
    },
}

impl DependencyNode {
    pub fn label(&self) -> &str {
        match self {
            DependencyNode::Leaf(label) => label,
            DependencyNode::Branch { label, .. } => label,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, DependencyNode::Leaf(_))
    }
}

/// Display label of a job inside a dependency tree.
///
/// The missing space before `in` is part of the established output format.
pub fn tree_label(job: &Job) -> String {
    format!("{}in {}", job.jid, job.queue_name)
}

/// Ids slated for cancellation, deduplicated, in insertion order.
///
/// Owned by exactly one closure computation.
#[derive(Debug, Clone, Default)]
pub struct CancelSet {
    order: Vec<JobId>,
    members: HashSet<JobId>,
}

impl CancelSet {
    pub fn contains(&self, jid: &JobId) -> bool {
        self.members.contains(jid)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, jid: JobId) -> bool {
        if !self.members.insert(jid.clone()) {
            return false;
        }
        self.order.push(jid);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<JobId> {
        self.order
    }
}

#[derive(Default)]
struct RootWalk {
    roots: BTreeSet<JobId>,
    /// Ids whose ancestry is fully explored.
    expanded: HashSet<JobId>,
    /// Ids on the current descent.
    path: HashSet<JobId>,
}

/// Resolver for roots, trees and cancellation closures of the job DAG.
pub struct DependencyGraph<'s, S> {
    store: &'s S,
}

impl<'s, S: JobStore> DependencyGraph<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Every job without dependencies reachable upward from `jid`.
    ///
    /// A job with no dependencies is its own only root. Roots reached
    /// through several paths appear once.
    pub async fn root_jobs(&self, jid: &JobId) -> Result<BTreeSet<JobId>, ResolveError> {
        let mut walk = RootWalk::default();
        self.collect_roots(jid.clone(), &mut walk).await?;

        tracing::debug!(jid = %jid, roots = walk.roots.len(), "Resolved root jobs");
        Ok(walk.roots)
    }

    fn collect_roots<'a>(
        &'a self,
        jid: JobId,
        walk: &'a mut RootWalk,
    ) -> BoxFuture<'a, Result<(), ResolveError>> {
        Box::pin(async move {
            if walk.expanded.contains(&jid) {
                return Ok(());
            }

            let job = fetch_job(self.store, &jid).await?;
            if job.is_root() {
                walk.roots.insert(job.jid);
                walk.expanded.insert(jid);
                return Ok(());
            }

            walk.path.insert(jid.clone());
            for dependency in job.dependencies {
                if walk.path.contains(&dependency) {
                    return Err(ResolveError::CyclicDependency(dependency));
                }
                self.collect_roots(dependency, &mut *walk).await?;
            }
            walk.path.remove(&jid);
            walk.expanded.insert(jid);

            Ok(())
        })
    }

    /// Tree rooted at `jid`, branching over `dependents`.
    pub async fn dependency_subtree(&self, jid: &JobId) -> Result<DependencyNode, ResolveError> {
        let mut path = HashSet::new();
        self.build_subtree(jid.clone(), &mut path).await
    }

    fn build_subtree<'a>(
        &'a self,
        jid: JobId,
        path: &'a mut HashSet<JobId>,
    ) -> BoxFuture<'a, Result<DependencyNode, ResolveError>> {
        Box::pin(async move {
            let job = fetch_job(self.store, &jid).await?;
            let label = tree_label(&job);

            if job.dependents.is_empty() {
                return Ok(DependencyNode::Leaf(label));
            }

            path.insert(jid.clone());
            let mut children = Vec::with_capacity(job.dependents.len());
            for dependent in job.dependents {
                if path.contains(&dependent) {
                    return Err(ResolveError::CyclicDependency(dependent));
                }
                children.push(self.build_subtree(dependent, &mut *path).await?);
            }
            path.remove(&jid);

            Ok(DependencyNode::Branch { label, children })
        })
    }

    /// One tree per root of `jid`.
    ///
    /// Each tree covers the full dependents closure of its root; it is not
    /// cut off at `jid`. Root order follows the id ordering of the root set.
    pub async fn dependency_tree(&self, jid: &JobId) -> Result<Vec<DependencyNode>, ResolveError> {
        let roots = self.root_jobs(jid).await?;

        let mut trees = Vec::with_capacity(roots.len());
        for root in &roots {
            trees.push(self.dependency_subtree(root).await?);
        }
        Ok(trees)
    }

    /// Largest set of jobs, starting at `jid` and moving up through
    /// `dependencies`, that can be cancelled without stranding a dependent.
    ///
    /// A job joins the set only once all of its dependents are already in
    /// it, so a job with outstanding dependents yields an empty result. The
    /// returned order satisfies that rule for every prefix.
    pub async fn safe_cancel_closure(&self, jid: &JobId) -> Result<Vec<JobId>, ResolveError> {
        let mut cancel = CancelSet::default();
        self.extend_cancel(jid.clone(), &mut cancel).await?;

        tracing::debug!(jid = %jid, count = cancel.len(), "Computed safe cancel closure");
        Ok(cancel.into_vec())
    }

    fn extend_cancel<'a>(
        &'a self,
        jid: JobId,
        cancel: &'a mut CancelSet,
    ) -> BoxFuture<'a, Result<(), ResolveError>> {
        Box::pin(async move {
            if cancel.contains(&jid) {
                return Ok(());
            }

            let job = fetch_job(self.store, &jid).await?;
            if let Some(blocker) = job.dependents.iter().find(|d| !cancel.contains(d)) {
                tracing::trace!(jid = %jid, blocker = %blocker, "Job still has a live dependent");
                return Ok(());
            }

            cancel.insert(job.jid);
            for dependency in job.dependencies {
                self.extend_cancel(dependency, &mut *cancel).await?;
            }

            Ok(())
        })
    }
}
