use std::collections::HashMap;

use scm::commit::ScmTag;
use scm::platforms::ScmPlatformClient;
use serde::Serialize;

use crate::groups::ChangeGroup;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Release {
    pub tag: ScmTag,

    /// Link comparing the release to the one before it
    pub compare_url: String,

    pub issues: Vec<ChangeGroup>,

    pub merges: Vec<ChangeGroup>,
}

/// Builds one release per tag, newest-first, each compared against the next older tag.
///
/// The oldest tag is compared against `base`.
pub fn assemble_releases<P>(
    platform: &P,
    tags: &[ScmTag],
    base: &str,
    mut issues: HashMap<String, Vec<ChangeGroup>>,
    mut merges: HashMap<String, Vec<ChangeGroup>>,
) -> Vec<Release>
where
    P: ScmPlatformClient + ?Sized,
{
    tags.iter()
        .enumerate()
        .map(|(i, tag)| {
            let previous = tags.get(i + 1).map_or(base, |t| t.name.as_str());
            Release {
                compare_url: platform.compare_url(previous, &tag.name),
                issues: issues.remove(&tag.name).unwrap_or_default(),
                merges: merges.remove(&tag.name).unwrap_or_default(),
                tag: tag.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use scm::commit::ScmTag;
    use testing::{issue, InMemoryPlatform};

    use crate::groups::{ChangeGroup, CLOSED_ISSUES};
    use crate::release::assemble_releases;

    fn tag(name: &str, seconds: i64) -> ScmTag {
        ScmTag {
            name: name.to_string(),
            timestamp: Utc.timestamp_opt(seconds, 0).unwrap(),
            commit_id: Some(name.to_string()),
            url: String::new(),
        }
    }

    #[test]
    fn compares_against_previous_tag() {
        let platform = InMemoryPlatform::new("main");
        let tags = vec![tag("v0.1.3", 30), tag("v0.1.2", 20), tag("v0.1.1", 10)];
        let issues = HashMap::from([(
            "v0.1.2".to_string(),
            vec![ChangeGroup {
                title: CLOSED_ISSUES.to_string(),
                changes: vec![issue(1, &[], 15)],
            }],
        )]);

        let releases = assemble_releases(&platform, &tags, "c1", issues, HashMap::new());

        let urls: Vec<&str> = releases.iter().map(|r| r.compare_url.as_str()).collect();
        assert_eq!(
            vec![
                "https://example.com/compare/v0.1.2...v0.1.3",
                "https://example.com/compare/v0.1.1...v0.1.2",
                "https://example.com/compare/c1...v0.1.1",
            ],
            urls
        );

        assert!(releases[0].issues.is_empty());
        assert_eq!(1, releases[1].issues.len());
        assert!(releases.iter().all(|r| r.merges.is_empty()));
    }

    #[test]
    fn no_tags_no_releases() {
        let platform = InMemoryPlatform::new("main");
        assert!(assemble_releases(&platform, &[], "c1", HashMap::new(), HashMap::new()).is_empty());
    }
}
