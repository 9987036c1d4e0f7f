use std::collections::HashMap;

use scm::commit::{ScmChange, ScmTag};
use tracing::debug;

use crate::revisions::RevisionIndex;

/// Tag name to the changes first released in it, in input order.
pub type Attribution = HashMap<String, Vec<ScmChange>>;

/// Assigns each issue to the oldest tag released at or after the issue was closed.
///
/// Issues closed after every tag are unreleased and dropped.
pub fn attribute_issues(tags: &[ScmTag], issues: Vec<ScmChange>) -> Attribution {
    let mut attribution = Attribution::new();
    for issue in issues {
        let tag = tags
            .iter()
            .filter(|t| t.timestamp >= issue.timestamp)
            .min_by_key(|t| t.timestamp);

        match tag {
            Some(tag) => attribution
                .entry(tag.name.clone())
                .or_default()
                .push(issue),
            None => debug!("issue #{} is unreleased", issue.number),
        }
    }

    attribution
}

/// Assigns each merged change to the first release whose history contains its landing commit.
///
/// A commit only reachable from the release branch goes to the future tag when `tags` starts
/// with one. Changes without a landing commit or outside the index are dropped.
pub fn attribute_merges(
    tags: &[ScmTag],
    index: &RevisionIndex,
    merges: Vec<ScmChange>,
) -> Attribution {
    let future = tags.first().filter(|t| t.is_future());

    let mut attribution = Attribution::new();
    for merge in merges {
        let Some(revision) = merge.commit_id.as_deref().and_then(|id| index.get(id)) else {
            debug!("change #{} has no known landing commit", merge.number);
            continue;
        };

        let tag = match (revision.earliest_tag(), future) {
            (Some(tag), _) => tag.to_string(),
            (None, Some(future)) => future.name.clone(),
            (None, None) => {
                debug!("change #{} is unreleased", merge.number);
                continue;
            }
        };

        attribution.entry(tag).or_default().push(merge);
    }

    attribution
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use scm::commit::{ScmBranch, ScmTag};
    use scm::platforms::ScmPlatformClient;
    use testing::{at, issue, merged, InMemoryPlatform};
    use tokio_util::sync::CancellationToken;

    use crate::attribution::{attribute_issues, attribute_merges};
    use crate::revisions::RevisionIndex;
    use crate::tags::prepare_tags;

    fn tag(name: &str, seconds: i64) -> ScmTag {
        ScmTag {
            name: name.to_string(),
            timestamp: Utc.timestamp_opt(seconds, 0).unwrap(),
            commit_id: Some(format!("sha-{name}")),
            url: String::new(),
        }
    }

    fn numbers(changes: Option<&Vec<scm::commit::ScmChange>>) -> Vec<u64> {
        changes
            .map(|c| c.iter().map(|c| c.number).collect())
            .unwrap_or_default()
    }

    #[test]
    fn issue_goes_to_earliest_tag_after_close() {
        let tags = vec![tag("v0.1.3", 101), tag("v0.1.2", 99)];
        let attribution = attribute_issues(&tags, vec![issue(1, &[], 100)]);

        assert_eq!(vec![1], numbers(attribution.get("v0.1.3")));
        assert!(!attribution.contains_key("v0.1.2"));
    }

    #[test]
    fn issue_closed_at_release_time_is_in_release() {
        let tags = vec![tag("v0.1.3", 200), tag("v0.1.2", 100)];
        let attribution = attribute_issues(&tags, vec![issue(1, &[], 100)]);
        assert_eq!(vec![1], numbers(attribution.get("v0.1.2")));
    }

    #[test]
    fn unreleased_issue_dropped() {
        let tags = vec![tag("v0.1.2", 100)];
        assert!(attribute_issues(&tags, vec![issue(1, &[], 101)]).is_empty());
    }

    #[test]
    fn future_tag_collects_recent_issues() {
        let future = ScmTag {
            commit_id: None,
            ..tag("v0.2.0", 1_000)
        };
        let tags = vec![future, tag("v0.1.2", 100)];

        let attribution = attribute_issues(&tags, vec![issue(1, &[], 50), issue(2, &[], 500)]);
        assert_eq!(vec![1], numbers(attribution.get("v0.1.2")));
        assert_eq!(vec![2], numbers(attribution.get("v0.2.0")));
    }

    // c1 <- c2 <- c3 (v0.1.2) <- c4 (v0.1.3) <- c5
    async fn merge_fixture(future: bool) -> (Vec<ScmTag>, RevisionIndex) {
        let platform = InMemoryPlatform::new("main")
            .linear(5)
            .tag("v0.1.2", "c3")
            .tag("v0.1.3", "c4");
        let cancel = CancellationToken::new();
        let mut tags = prepare_tags(platform.fetch_tags(&cancel).await.unwrap(), &[], None);
        if future {
            tags.insert(0, platform.future_tag("v0.2.0"));
        }

        let branch = ScmBranch {
            name: "main".to_string(),
            head: "c5".to_string(),
        };
        let index = RevisionIndex::build(&platform, &branch, &tags, &cancel)
            .await
            .unwrap();
        (tags, index)
    }

    #[tokio::test]
    async fn merge_goes_to_earliest_containing_tag() {
        let (tags, index) = merge_fixture(false).await;
        let attribution = attribute_merges(
            &tags,
            &index,
            vec![merged(1, &[], 20, "c2"), merged(2, &[], 40, "c4")],
        );

        assert_eq!(vec![1], numbers(attribution.get("v0.1.2")));
        assert_eq!(vec![2], numbers(attribution.get("v0.1.3")));
    }

    #[tokio::test]
    async fn branch_only_merge_needs_future_tag() {
        let (tags, index) = merge_fixture(false).await;
        let attribution = attribute_merges(&tags, &index, vec![merged(1, &[], 50, "c5")]);
        assert!(attribution.is_empty());

        let (tags, index) = merge_fixture(true).await;
        let attribution = attribute_merges(&tags, &index, vec![merged(1, &[], 50, "c5")]);
        assert_eq!(vec![1], numbers(attribution.get("v0.2.0")));
    }

    #[tokio::test]
    async fn unknown_commits_dropped() {
        let (tags, index) = merge_fixture(true).await;
        let mut without_commit = merged(2, &[], 50, "c5");
        without_commit.commit_id = None;

        let attribution = attribute_merges(
            &tags,
            &index,
            vec![merged(1, &[], 50, "elsewhere"), without_commit],
        );
        assert!(attribution.is_empty());
    }

    proptest! {
        // Issues and merges landed at the same commit time end up in the same release.
        #[test]
        fn issues_and_merges_agree(tagged in proptest::collection::btree_set(1usize..20, 1..6), landed in 1usize..20) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let mut platform = InMemoryPlatform::new("main").linear(20);
            for i in &tagged {
                platform = platform.tag(&format!("t{i}"), &format!("c{i}"));
            }

            let cancel = CancellationToken::new();
            let (tags, index) = runtime.block_on(async {
                let tags = prepare_tags(platform.fetch_tags(&cancel).await.unwrap(), &[], None);
                let branch = platform.fetch_default_branch(&cancel).await.unwrap();
                let index = RevisionIndex::build(&platform, &branch, &tags, &cancel).await.unwrap();
                (tags, index)
            });

            let landed_at = (landed as i64) * 10;
            let commit = format!("c{landed}");
            let issues = attribute_issues(&tags, vec![issue(1, &[], landed_at)]);
            let merges = attribute_merges(&tags, &index, vec![merged(1, &[], landed_at, &commit)]);

            let expected = tagged.iter().find(|i| **i >= landed).map(|i| format!("t{i}"));
            let issue_tag = issues.keys().next().cloned();
            let merge_tag = merges.keys().next().cloned();
            prop_assert_eq!(&expected, &issue_tag);
            prop_assert_eq!(&expected, &merge_tag);

            if let Some(name) = expected {
                let release = tags.iter().find(|t| t.name == name).unwrap();
                prop_assert!(release.timestamp >= at(landed_at));
                prop_assert!(tags
                    .iter()
                    .filter(|t| t.timestamp >= at(landed_at))
                    .all(|t| t.timestamp >= release.timestamp));
            }
        }
    }
}
