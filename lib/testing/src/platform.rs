use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scm::commit::{ScmBranch, ScmChange, ScmCommit, ScmTag};
use scm::errors::{ScmError, ScmResult};
use scm::platforms::{IssuesAndMerges, ScmPlatformClient};
use tokio_util::sync::CancellationToken;

use crate::fixtures::at;

pub const BASE_URL: &str = "https://example.com";

/// A hosted repository held in memory, built from an explicit commit graph.
///
/// Tags take the time of the commit they point at. Ancestry walks are breadth first from the
/// requested reference, so the reference itself is always first.
pub struct InMemoryPlatform {
    default_branch: String,
    commits: HashMap<String, ScmCommit>,
    branches: HashMap<String, String>,
    tags: Vec<ScmTag>,
    issues: Vec<ScmChange>,
    merges: Vec<ScmChange>,
    now: DateTime<Utc>,
    failing_reference: Option<String>,
    ancestry_calls: AtomicUsize,
    commits_fetched: AtomicUsize,
    requested_since: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl InMemoryPlatform {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            commits: HashMap::new(),
            branches: HashMap::new(),
            tags: Vec::new(),
            issues: Vec::new(),
            merges: Vec::new(),
            now: at(1_000_000),
            failing_reference: None,
            ancestry_calls: AtomicUsize::new(0),
            commits_fetched: AtomicUsize::new(0),
            requested_since: Mutex::new(Vec::new()),
        }
    }

    /// Adds a commit at `seconds`. The default branch follows the last commit added unless set
    /// explicitly with [`InMemoryPlatform::branch`].
    pub fn commit(mut self, id: &str, seconds: i64, parents: &[&str]) -> Self {
        self.commits.insert(
            id.to_string(),
            ScmCommit {
                id: id.to_string(),
                timestamp: at(seconds),
                parents: parents.iter().map(|p| p.to_string()).collect(),
            },
        );
        self.branches
            .entry(self.default_branch.clone())
            .and_modify(|head| *head = id.to_string())
            .or_insert_with(|| id.to_string());
        self
    }

    /// A straight line of commits `c1 <- c2 <- ... <- cN`, `ci` at `i * 10` seconds.
    pub fn linear(self, count: usize) -> Self {
        (1..=count).fold(self, |platform, i| {
            let id = format!("c{i}");
            let parent = format!("c{}", i - 1);
            if i == 1 {
                platform.commit(&id, 10, &[])
            } else {
                platform.commit(&id, (i as i64) * 10, &[parent.as_str()])
            }
        })
    }

    pub fn branch(mut self, name: &str, head: &str) -> Self {
        self.branches.insert(name.to_string(), head.to_string());
        self
    }

    pub fn tag(mut self, name: &str, commit: &str) -> Self {
        let timestamp = self
            .commits
            .get(commit)
            .map(|c| c.timestamp)
            .unwrap_or_else(|| panic!("tag {name} points at unknown commit {commit}"));

        self.tags.push(ScmTag {
            name: name.to_string(),
            timestamp,
            commit_id: Some(commit.to_string()),
            url: format!("{BASE_URL}/tree/{name}"),
        });
        self
    }

    pub fn issue(mut self, issue: ScmChange) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn merge(mut self, merge: ScmChange) -> Self {
        self.merges.push(merge);
        self
    }

    /// Time given to future tags.
    pub fn now(mut self, seconds: i64) -> Self {
        self.now = at(seconds);
        self
    }

    /// Ancestry lookups of `reference` fail.
    pub fn failing_ancestry(mut self, reference: &str) -> Self {
        self.failing_reference = Some(reference.to_string());
        self
    }

    pub fn ancestry_calls(&self) -> usize {
        self.ancestry_calls.load(Ordering::SeqCst)
    }

    /// Commits returned by all ancestry lookups so far, repeats included.
    pub fn commits_fetched(&self) -> usize {
        self.commits_fetched.load(Ordering::SeqCst)
    }

    /// `since` of every issue/merge fetch, in call order.
    pub fn requested_since(&self) -> Vec<Option<DateTime<Utc>>> {
        self.requested_since.lock().clone()
    }

    fn resolve(&self, reference: &str) -> Option<&str> {
        if let Some(tag) = self.tags.iter().find(|t| t.name == reference) {
            return tag.commit_id.as_deref();
        }

        if let Some(head) = self.branches.get(reference) {
            return Some(head.as_str());
        }

        self.commits.get(reference).map(|c| c.id.as_str())
    }

    fn ancestors(&self, start: &str) -> Vec<ScmCommit> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.to_string()]);
        let mut commits = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }

            if let Some(commit) = self.commits.get(&id) {
                commits.push(commit.clone());
                queue.extend(commit.parents.iter().cloned());
            }
        }

        commits
    }

    fn check(cancel: &CancellationToken) -> ScmResult<()> {
        if cancel.is_cancelled() {
            Err(ScmError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ScmPlatformClient for InMemoryPlatform {
    async fn fetch_default_branch(&self, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        let name = self.default_branch.clone();
        self.fetch_branch(&name, cancel).await
    }

    async fn fetch_branch(&self, name: &str, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        Self::check(cancel)?;
        self.branches
            .get(name)
            .map(|head| ScmBranch {
                name: name.to_string(),
                head: head.clone(),
            })
            .ok_or_else(|| ScmError::NotFound(format!("branch {name}")))
    }

    async fn fetch_tags(&self, cancel: &CancellationToken) -> ScmResult<Vec<ScmTag>> {
        Self::check(cancel)?;
        Ok(self.tags.clone())
    }

    async fn fetch_first_commit(&self, cancel: &CancellationToken) -> ScmResult<ScmCommit> {
        Self::check(cancel)?;
        let head = self
            .branches
            .get(&self.default_branch)
            .ok_or_else(|| ScmError::NotFound("first commit".to_string()))?;

        self.ancestors(head)
            .into_iter()
            .filter(|commit| commit.parents.is_empty())
            .min_by_key(|commit| commit.timestamp)
            .ok_or_else(|| ScmError::NotFound("first commit".to_string()))
    }

    async fn fetch_parent_commits(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmCommit>> {
        Self::check(cancel)?;
        self.ancestry_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_reference.as_deref() == Some(reference) {
            return Err(ScmError::NotFound(format!("ancestry of {reference}")));
        }

        let start = self
            .resolve(reference)
            .ok_or_else(|| ScmError::NotFound(format!("reference {reference}")))?;
        let commits = self.ancestors(start);
        self.commits_fetched.fetch_add(commits.len(), Ordering::SeqCst);
        Ok(commits)
    }

    async fn fetch_issues_and_merges(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<IssuesAndMerges> {
        Self::check(cancel)?;
        self.requested_since.lock().push(since);

        let after = |change: &&ScmChange| since.is_none_or(|since| change.timestamp >= since);
        Ok(IssuesAndMerges {
            issues: self.issues.iter().filter(after).cloned().collect(),
            merges: self.merges.iter().filter(after).cloned().collect(),
        })
    }

    fn compare_url(&self, base: &str, head: &str) -> String {
        format!("{BASE_URL}/compare/{base}...{head}")
    }

    fn future_tag(&self, name: &str) -> ScmTag {
        ScmTag {
            name: name.to_string(),
            timestamp: self.now,
            commit_id: None,
            url: format!("{BASE_URL}/tree/{name}"),
        }
    }
}
