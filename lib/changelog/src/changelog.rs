use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scm::commit::{ScmChange, ScmTag};
use scm::platforms::ScmPlatformClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::attribution::{attribute_issues, attribute_merges};
use crate::document::ChangelogDocument;
use crate::errors::ChangelogResult;
use crate::groups::{group_attribution, CLOSED_ISSUES, MERGED_CHANGES};
use crate::release::{assemble_releases, Release};
use crate::revisions::RevisionIndex;
use crate::settings::ChangelogSettings;
use crate::tags::{prepare_tags, resolve_tags};

/// One changelog run against a remote repository.
///
/// The platform should memoize ancestry lookups, see `scm::platforms::cache::CachedPlatform`,
/// as every resolved tag walks its full history.
pub struct Changelog<'a, P: ?Sized> {
    platform: &'a P,
    settings: &'a ChangelogSettings,
}

impl<'a, P> Changelog<'a, P>
where
    P: ScmPlatformClient + ?Sized,
{
    pub fn new(platform: &'a P, settings: &'a ChangelogSettings) -> Self {
        Self { platform, settings }
    }

    /// Releases missing from `existing`, newest-first. Empty when the changelog is up to date.
    ///
    /// Nothing is written. Any platform failure or cancellation aborts the run.
    pub async fn generate(
        &self,
        existing: &ChangelogDocument,
        cancel: &CancellationToken,
    ) -> ChangelogResult<Vec<Release>> {
        let branch = match &self.settings.branch {
            Some(name) => self.platform.fetch_branch(name, cancel).await?,
            None => self.platform.fetch_default_branch(cancel).await?,
        };

        let known = prepare_tags(
            self.platform.fetch_tags(cancel).await?,
            &self.settings.exclude_tags,
            self.settings.exclude_tags_regex.as_ref(),
        );
        let tags = resolve_tags(
            self.platform,
            &known,
            &existing.releases,
            &self.settings.tag_range(),
        )?;
        if tags.is_empty() {
            info!("no new tags since the last changelog");
            return Ok(vec![]);
        }
        info!("generating {} releases from branch {}", tags.len(), branch.name);

        let index = RevisionIndex::build(self.platform, &branch, &tags, cancel).await?;
        debug!("indexed {} commits", index.len());
        let first = self.platform.fetch_first_commit(cancel).await?;

        let since = released_before(&known, &tags);
        let fetched = self.platform.fetch_issues_and_merges(since, cancel).await?;
        let issues = self.unreleased(fetched.issues, since);
        let merges = self.unreleased(fetched.merges, since);
        debug!(
            "{} issues and {} merges to attribute",
            issues.len(),
            merges.len()
        );

        let issues = attribute_issues(&tags, issues);
        let merges = attribute_merges(&tags, &index, merges);

        let issues = group_attribution(&issues, &self.settings.issue_groups, CLOSED_ISSUES);
        let merges = group_attribution(&merges, &self.settings.merge_groups, MERGED_CHANGES);

        Ok(assemble_releases(
            self.platform,
            &tags,
            &first.id,
            issues,
            merges,
        ))
    }

    /// Drops changes with an excluded label and those finished by `since`.
    fn unreleased(&self, changes: Vec<ScmChange>, since: Option<DateTime<Utc>>) -> Vec<ScmChange> {
        changes
            .into_iter()
            .filter(|c| !c.has_any_label(&self.settings.exclude_labels))
            .filter(|c| since.is_none_or(|since| c.timestamp > since))
            .collect()
    }
}

/// Release time of the newest known tag older than every resolved tag.
fn released_before(known: &[ScmTag], resolved: &[ScmTag]) -> Option<DateTime<Utc>> {
    let oldest = resolved.iter().map(|t| t.timestamp).min()?;
    let names: HashSet<&str> = resolved.iter().map(|t| t.name.as_str()).collect();
    known
        .iter()
        .filter(|t| !names.contains(t.name.as_str()) && t.timestamp < oldest)
        .map(|t| t.timestamp)
        .max()
}
