use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::commit::{ScmBranch, ScmCommit, ScmTag};
use crate::errors::{ScmError, ScmResult};
use crate::platforms::{IssuesAndMerges, ScmPlatformClient};

/// Memoizes commit and ancestry lookups of the wrapped platform.
///
/// Every commit returned by a walk is kept by hash along with its parents. A later walk from a
/// commit whose whole history is already known is answered from that graph, so walking the
/// release branch once covers every tag on it. Only walks reaching an unseen commit go to the
/// wrapped platform. Failed lookups are not cached.
pub struct CachedPlatform<P> {
    inner: P,
    ancestry: Mutex<HashMap<String, Arc<Vec<ScmCommit>>>>,
    commits: Mutex<HashMap<String, ScmCommit>>,
    first_commit: Mutex<Option<ScmCommit>>,
}

impl<P> CachedPlatform<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            ancestry: Mutex::new(HashMap::new()),
            commits: Mutex::new(HashMap::new()),
            first_commit: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of distinct commits seen so far.
    pub fn commit_count(&self) -> usize {
        self.commits.lock().len()
    }

    /// Ancestry of `id` built from known commits, breadth first. `None` when `id` or any of its
    /// ancestors has not been seen.
    fn known_ancestry(&self, id: &str) -> Option<Vec<ScmCommit>> {
        let known = self.commits.lock();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id]);
        let mut ancestry = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }

            let commit = known.get(id)?;
            ancestry.push(commit.clone());
            queue.extend(commit.parents.iter().map(String::as_str));
        }

        Some(ancestry)
    }

    fn remember(&self, reference: &str, commits: Arc<Vec<ScmCommit>>) {
        let mut known = self.commits.lock();
        for commit in commits.iter() {
            known
                .entry(commit.id.clone())
                .or_insert_with(|| commit.clone());
        }
        drop(known);

        self.ancestry.lock().insert(reference.to_string(), commits);
    }
}

#[async_trait::async_trait]
impl<P> ScmPlatformClient for CachedPlatform<P>
where
    P: ScmPlatformClient,
{
    async fn fetch_default_branch(&self, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        self.inner.fetch_default_branch(cancel).await
    }

    async fn fetch_branch(&self, name: &str, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        self.inner.fetch_branch(name, cancel).await
    }

    async fn fetch_tags(&self, cancel: &CancellationToken) -> ScmResult<Vec<ScmTag>> {
        self.inner.fetch_tags(cancel).await
    }

    async fn fetch_first_commit(&self, cancel: &CancellationToken) -> ScmResult<ScmCommit> {
        let cached = self.first_commit.lock().clone();
        if let Some(commit) = cached {
            return Ok(commit);
        }

        let commit = self.inner.fetch_first_commit(cancel).await?;
        *self.first_commit.lock() = Some(commit.clone());
        Ok(commit)
    }

    async fn fetch_parent_commits(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmCommit>> {
        if cancel.is_cancelled() {
            return Err(ScmError::Cancelled);
        }

        // the lock must not be held across the await below
        let cached = self.ancestry.lock().get(reference).cloned();
        if let Some(commits) = cached {
            trace!("ancestry of {reference} served from cache");
            return Ok(commits.as_ref().clone());
        }

        if let Some(commits) = self.known_ancestry(reference) {
            trace!("ancestry of {reference} built from {} known commits", commits.len());
            return Ok(commits);
        }

        let commits = Arc::new(self.inner.fetch_parent_commits(reference, cancel).await?);
        self.remember(reference, Arc::clone(&commits));
        Ok(commits.as_ref().clone())
    }

    async fn fetch_issues_and_merges(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<IssuesAndMerges> {
        self.inner.fetch_issues_and_merges(since, cancel).await
    }

    fn compare_url(&self, base: &str, head: &str) -> String {
        self.inner.compare_url(base, head)
    }

    fn future_tag(&self, name: &str) -> ScmTag {
        self.inner.future_tag(name)
    }
}
