use std::collections::HashMap;

use scm::commit::{ScmBranch, ScmTag};
use scm::platforms::ScmPlatformClient;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ChangelogResult;

/// Where a single commit lives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Revision {
    /// Release branch, if the commit is reachable from its head.
    pub branch: Option<String>,

    /// Tags whose history contains the commit, newest tag first.
    pub tags: Vec<String>,
}

impl Revision {
    /// The oldest tag containing the commit, i.e. the first release that shipped it.
    pub fn earliest_tag(&self) -> Option<&str> {
        self.tags.last().map(String::as_str)
    }
}

/// Commit hash to [`Revision`] for every commit reachable from the release branch or one of
/// the resolved tags.
#[derive(Debug, Default)]
pub struct RevisionIndex {
    revisions: HashMap<String, Revision>,
}

impl RevisionIndex {
    /// Walks the branch and then each tag, newest to oldest, so every [`Revision::tags`] list
    /// ends up newest-first. Future tags are skipped. Any failed walk fails the whole index.
    pub async fn build<P>(
        platform: &P,
        branch: &ScmBranch,
        tags: &[ScmTag],
        cancel: &CancellationToken,
    ) -> ChangelogResult<Self>
    where
        P: ScmPlatformClient + ?Sized,
    {
        let mut index = Self::default();

        let commits = platform.fetch_parent_commits(&branch.head, cancel).await?;
        debug!("branch {} reaches {} commits", branch.name, commits.len());
        for commit in commits {
            index.revisions.entry(commit.id).or_default().branch = Some(branch.name.clone());
        }

        for tag in tags {
            let Some(commit_id) = &tag.commit_id else {
                continue;
            };

            let commits = platform.fetch_parent_commits(commit_id, cancel).await?;
            debug!("tag {} reaches {} commits", tag.name, commits.len());
            for commit in commits {
                index.append_tag(commit.id, &tag.name);
            }
        }

        Ok(index)
    }

    fn append_tag(&mut self, commit: String, tag: &str) {
        let revision = self.revisions.entry(commit).or_default();
        if revision.tags.last().map(String::as_str) != Some(tag) {
            revision.tags.push(tag.to_string());
        }
    }

    pub fn get(&self, commit: &str) -> Option<&Revision> {
        self.revisions.get(commit)
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use scm::commit::ScmBranch;
    use scm::errors::ScmError;
    use scm::platforms::cache::CachedPlatform;
    use scm::platforms::ScmPlatformClient;
    use tokio_util::sync::CancellationToken;
    use testing::InMemoryPlatform;

    use crate::errors::ChangelogErrors;
    use crate::revisions::RevisionIndex;
    use crate::tags::prepare_tags;

    // c1 <- c2 (v0.1.0) <- c3 <- c4 (v0.1.1) <- c5 (v0.1.2) <- c6
    fn platform() -> InMemoryPlatform {
        InMemoryPlatform::new("main")
            .linear(6)
            .tag("v0.1.0", "c2")
            .tag("v0.1.1", "c4")
            .tag("v0.1.2", "c5")
    }

    async fn index(platform: &InMemoryPlatform, future: bool) -> RevisionIndex {
        let cancel = CancellationToken::new();
        let branch = platform.fetch_default_branch(&cancel).await.unwrap();
        let mut tags = prepare_tags(platform.fetch_tags(&cancel).await.unwrap(), &[], None);
        if future {
            tags.insert(0, platform.future_tag("v0.2.0"));
        }
        RevisionIndex::build(platform, &branch, &tags, &cancel)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn tags_listed_newest_first() {
        let index = index(&platform(), false).await;

        let shared = index.get("c1").unwrap();
        assert_eq!(vec!["v0.1.2", "v0.1.1", "v0.1.0"], shared.tags);
        assert_eq!(Some("v0.1.0"), shared.earliest_tag());
        assert_eq!(Some("main".to_string()), shared.branch);

        assert_eq!(Some("v0.1.1"), index.get("c3").unwrap().earliest_tag());
        assert_eq!(Some("v0.1.2"), index.get("c5").unwrap().earliest_tag());
        assert_eq!(6, index.len());
    }

    #[tokio::test]
    async fn branch_only_commits_have_no_tags() {
        let index = index(&platform(), true).await;

        let untagged = index.get("c6").unwrap();
        assert!(untagged.tags.is_empty());
        assert_eq!(None, untagged.earliest_tag());
        assert_eq!(Some("main".to_string()), untagged.branch);
    }

    #[tokio::test]
    async fn tags_off_the_branch_are_indexed() {
        let platform = InMemoryPlatform::new("main")
            .linear(3)
            .commit("hotfix", 35, &["c2"])
            .branch("main", "c3")
            .tag("v0.1.1", "hotfix");
        let index = index(&platform, false).await;

        let hotfix = index.get("hotfix").unwrap();
        assert_eq!(None, hotfix.branch);
        assert_eq!(vec!["v0.1.1"], hotfix.tags);
        assert_eq!(None, index.get("c3").unwrap().earliest_tag());
    }

    #[tokio::test]
    async fn shared_history_fetched_once() {
        let cached = CachedPlatform::new(platform());
        let cancel = CancellationToken::new();
        let branch = ScmBranch {
            name: "main".to_string(),
            head: "c6".to_string(),
        };
        let tags = prepare_tags(cached.fetch_tags(&cancel).await.unwrap(), &[], None);

        RevisionIndex::build(&cached, &branch, &tags, &cancel)
            .await
            .unwrap();
        RevisionIndex::build(&cached, &branch, &tags, &cancel)
            .await
            .unwrap();

        assert_eq!(1, cached.inner().ancestry_calls());
        assert_eq!(6, cached.inner().commits_fetched());
        assert_eq!(6, cached.commit_count());
    }

    #[tokio::test]
    async fn each_commit_fetched_once_across_many_tags() {
        let platform = (1..=10).fold(InMemoryPlatform::new("main").linear(200), |p, i| {
            p.tag(&format!("v0.{i}.0"), &format!("c{}", i * 20))
        });
        let cached = CachedPlatform::new(platform);
        let cancel = CancellationToken::new();
        let branch = cached.fetch_default_branch(&cancel).await.unwrap();
        let tags = prepare_tags(cached.fetch_tags(&cancel).await.unwrap(), &[], None);

        let index = RevisionIndex::build(&cached, &branch, &tags, &cancel)
            .await
            .unwrap();

        assert_eq!(200, index.len());
        assert_eq!(200, cached.commit_count());
        assert_eq!(cached.commit_count(), cached.inner().commits_fetched());
        assert_eq!(Some("v0.1.0"), index.get("c1").unwrap().earliest_tag());
        assert_eq!(Some("v0.10.0"), index.get("c200").unwrap().earliest_tag());
        assert_eq!(10, index.get("c1").unwrap().tags.len());
    }

    #[tokio::test]
    async fn tag_off_the_branch_walked_separately() {
        let platform = InMemoryPlatform::new("main")
            .linear(3)
            .commit("hotfix", 35, &["c2"])
            .branch("main", "c3")
            .tag("v0.1.0", "c2")
            .tag("v0.1.1", "hotfix");
        let cached = CachedPlatform::new(platform);
        let cancel = CancellationToken::new();
        let branch = cached.fetch_default_branch(&cancel).await.unwrap();
        let tags = prepare_tags(cached.fetch_tags(&cancel).await.unwrap(), &[], None);

        let index = RevisionIndex::build(&cached, &branch, &tags, &cancel)
            .await
            .unwrap();

        assert_eq!(2, cached.inner().ancestry_calls());
        assert_eq!(4, cached.commit_count());
        assert_eq!(vec!["v0.1.1", "v0.1.0"], index.get("c1").unwrap().tags);
        assert_eq!(None, index.get("c3").unwrap().earliest_tag());
    }

    #[tokio::test]
    async fn failed_walk_aborts() {
        let platform = platform().failing_ancestry("c4");
        let cancel = CancellationToken::new();
        let branch = platform.fetch_default_branch(&cancel).await.unwrap();
        let tags = prepare_tags(platform.fetch_tags(&cancel).await.unwrap(), &[], None);

        let result = RevisionIndex::build(&platform, &branch, &tags, &cancel).await;
        assert!(matches!(
            result,
            Err(ChangelogErrors::ScmError(ScmError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn cancelled_before_walk() {
        let platform = platform();
        let cancel = CancellationToken::new();
        let branch = platform.fetch_default_branch(&cancel).await.unwrap();
        cancel.cancel();

        let result = RevisionIndex::build(&platform, &branch, &[], &cancel).await;
        assert!(matches!(
            result,
            Err(ChangelogErrors::ScmError(ScmError::Cancelled))
        ));
    }
}
