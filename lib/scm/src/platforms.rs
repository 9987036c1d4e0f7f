pub mod cache;
pub mod github;
pub mod gitlab;
mod http;

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use strum::EnumString;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::commit::{ScmBranch, ScmChange, ScmCommit, ScmTag};
use crate::errors::ScmResult;
use crate::platforms::github::GithubProvider;
use crate::platforms::gitlab::GitlabProvider;

// TODO: BitBucket / Gitea once the changelog engine is used outside of GitHub and GitLab
#[derive(
    Clone, Copy, Debug, Default, Deserialize, EnumString, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[remain::sorted]
pub enum ScmPlatforms {
    #[default]
    GitHub,
    GitLab,
}

/// Closed issues and merged changes, kept apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssuesAndMerges {
    pub issues: Vec<ScmChange>,
    pub merges: Vec<ScmChange>,
}

/// Read-only view of a hosted repository.
///
/// Every call that goes over the network takes a cancellation token. Implementations must
/// return [`crate::errors::ScmError::Cancelled`] once the token fires and must not retry.
#[async_trait::async_trait]
pub trait ScmPlatformClient: Send + Sync {
    async fn fetch_default_branch(&self, cancel: &CancellationToken) -> ScmResult<ScmBranch>;

    async fn fetch_branch(&self, name: &str, cancel: &CancellationToken) -> ScmResult<ScmBranch>;

    /// All tags in no particular order.
    async fn fetch_tags(&self, cancel: &CancellationToken) -> ScmResult<Vec<ScmTag>>;

    /// The root commit of the repository.
    async fn fetch_first_commit(&self, cancel: &CancellationToken) -> ScmResult<ScmCommit>;

    /// Every commit reachable from `reference` by following parent links, `reference`
    /// included.
    async fn fetch_parent_commits(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmCommit>>;

    /// Issues closed and changes merged, optionally only those touched after `since`.
    async fn fetch_issues_and_merges(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<IssuesAndMerges>;

    /// Web URL comparing `base` to `head`.
    fn compare_url(&self, base: &str, head: &str) -> String;

    /// A tag that doesn't exist yet, released now.
    fn future_tag(&self, name: &str) -> ScmTag;
}

#[async_trait::async_trait]
impl<T> ScmPlatformClient for Box<T>
where
    T: ScmPlatformClient + ?Sized,
{
    async fn fetch_default_branch(&self, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        (**self).fetch_default_branch(cancel).await
    }

    async fn fetch_branch(&self, name: &str, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        (**self).fetch_branch(name, cancel).await
    }

    async fn fetch_tags(&self, cancel: &CancellationToken) -> ScmResult<Vec<ScmTag>> {
        (**self).fetch_tags(cancel).await
    }

    async fn fetch_first_commit(&self, cancel: &CancellationToken) -> ScmResult<ScmCommit> {
        (**self).fetch_first_commit(cancel).await
    }

    async fn fetch_parent_commits(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmCommit>> {
        (**self).fetch_parent_commits(reference, cancel).await
    }

    async fn fetch_issues_and_merges(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<IssuesAndMerges> {
        (**self).fetch_issues_and_merges(since, cancel).await
    }

    fn compare_url(&self, base: &str, head: &str) -> String {
        (**self).compare_url(base, head)
    }

    fn future_tag(&self, name: &str) -> ScmTag {
        (**self).future_tag(name)
    }
}

/// Where a repository lives and how to talk to it.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScmRemote {
    pub platform: ScmPlatforms,

    /// Owner of the remote. A GitLab group path may contain slashes.
    pub owner: String,

    /// Repository name.
    pub repo: String,

    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Overrides the REST API root, for self-hosted instances.
    pub api_url: Option<Url>,

    /// Overrides the web root used for tag and compare links.
    pub web_url: Option<Url>,
}

impl ScmRemote {
    pub fn connect(&self) -> ScmResult<Box<dyn ScmPlatformClient>> {
        Ok(match self.platform {
            ScmPlatforms::GitHub => Box::new(GithubProvider::new(
                &self.owner,
                &self.repo,
                self.token.as_deref(),
                self.api_url.clone(),
                self.web_url.clone(),
            )?),
            ScmPlatforms::GitLab => Box::new(GitlabProvider::new(
                &self.owner,
                &self.repo,
                self.token.as_deref(),
                self.api_url.clone(),
                self.web_url.clone(),
            )?),
        })
    }
}
