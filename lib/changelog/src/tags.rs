use std::cmp::Ordering;
use std::collections::HashSet;

use regex::Regex;
use scm::commit::ScmTag;
use scm::platforms::ScmPlatformClient;
use tracing::debug;

use crate::document::RecordedRelease;
use crate::errors::{ChangelogErrors, ChangelogResult};

/// Bounds of the tags to generate entries for. All names are tag names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagRange {
    /// Oldest tag to include
    pub from: Option<String>,

    /// Newest tag to include
    pub to: Option<String>,

    /// Upcoming release to collect unreleased changes under
    pub future: Option<String>,
}

/// Drops excluded tags and orders the rest newest-first, ties broken by name descending.
pub fn prepare_tags(
    tags: Vec<ScmTag>,
    exclude_names: &[String],
    exclude_regex: Option<&Regex>,
) -> Vec<ScmTag> {
    let total = tags.len();
    let mut tags: Vec<ScmTag> = tags
        .into_iter()
        .filter(|t| !exclude_names.iter().any(|name| name == &t.name))
        .filter(|t| exclude_regex.is_none_or(|re| !re.is_match(&t.name)))
        .collect();

    tags.sort_by(|a, b| match b.timestamp.cmp(&a.timestamp) {
        Ordering::Equal => b.name.cmp(&a.name),
        ordering => ordering,
    });

    debug!("{} of {total} tags remain after exclusions", tags.len());
    tags
}

/// Tags that still need a changelog entry, newest-first.
///
/// `tags` must already be prepared. Tags recorded in `existing` are never candidates. `from`
/// drops every candidate older than it, then `to` drops every candidate newer than it, and a
/// future tag is put in front. An empty result means the changelog is up to date.
pub fn resolve_tags<P>(
    platform: &P,
    tags: &[ScmTag],
    existing: &[RecordedRelease],
    range: &TagRange,
) -> ChangelogResult<Vec<ScmTag>>
where
    P: ScmPlatformClient + ?Sized,
{
    let recorded: HashSet<&str> = existing.iter().map(|r| r.tag.as_str()).collect();
    let mut candidates: Vec<ScmTag> = tags
        .iter()
        .filter(|t| !recorded.contains(t.name.as_str()))
        .cloned()
        .collect();

    if let Some(from) = &range.from {
        let i = candidates
            .iter()
            .position(|t| &t.name == from)
            .ok_or_else(|| ChangelogErrors::InvalidFromTag {
                candidates: names(&candidates),
            })?;
        candidates.truncate(i + 1);
    }

    if let Some(to) = &range.to {
        let j = candidates
            .iter()
            .position(|t| &t.name == to)
            .ok_or_else(|| ChangelogErrors::InvalidToTag {
                candidates: names(&candidates),
            })?;
        candidates.drain(..j);
    }

    if let Some(future) = &range.future {
        if tags.iter().any(|t| &t.name == future) {
            return Err(ChangelogErrors::FutureTagExists(future.clone()));
        }
        candidates.insert(0, platform.future_tag(future));
    }

    debug!("resolved tags: [{}]", names(&candidates).join(", "));
    Ok(candidates)
}

fn names(tags: &[ScmTag]) -> Vec<String> {
    tags.iter().map(|t| t.name.clone()).collect()
}
