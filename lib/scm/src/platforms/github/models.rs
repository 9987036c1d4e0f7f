use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::commit::{ScmChange, ScmCommit, ScmUser};

#[derive(Debug, Deserialize)]
pub(crate) struct GithubRepository {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubCommitRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubBranch {
    pub name: String,
    pub commit: GithubCommitRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubTag {
    pub name: String,
    pub commit: GithubCommitRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubSignature {
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubCommitDetail {
    pub committer: GithubSignature,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubCommit {
    pub sha: String,
    pub commit: GithubCommitDetail,
    #[serde(default)]
    pub parents: Vec<GithubCommitRef>,
}

impl From<GithubCommit> for ScmCommit {
    fn from(value: GithubCommit) -> Self {
        Self {
            id: value.sha,
            timestamp: value.commit.committer.date,
            parents: value.parents.into_iter().map(|p| p.sha).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubUser {
    pub login: String,
    pub html_url: String,
}

impl From<GithubUser> for ScmUser {
    fn from(value: GithubUser) -> Self {
        Self {
            name: value.login,
            url: value.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubMilestone {
    pub title: String,
}

/// The issues endpoint also returns pull requests, flagged by `pull_request`.
#[derive(Debug, Deserialize)]
pub(crate) struct GithubIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<GithubLabel>,
    pub milestone: Option<GithubMilestone>,
    pub user: GithubUser,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<GithubUser>,
    pub pull_request: Option<serde_json::Value>,
}

impl GithubIssue {
    pub(crate) fn into_change(self) -> Option<ScmChange> {
        if self.pull_request.is_some() {
            return None;
        }

        let timestamp = self.closed_at?;
        Some(ScmChange {
            number: self.number,
            title: self.title,
            url: self.html_url,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            milestone: self.milestone.map(|m| m.title),
            timestamp,
            author: self.user.into(),
            closed_by: self.closed_by.map(ScmUser::from),
            commit_id: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubPull {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<GithubLabel>,
    pub milestone: Option<GithubMilestone>,
    pub user: GithubUser,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged_by: Option<GithubUser>,
    pub merge_commit_sha: Option<String>,
}

impl GithubPull {
    /// `None` for pull requests that were closed without being merged.
    pub(crate) fn into_change(self) -> Option<ScmChange> {
        let timestamp = self.merged_at?;
        Some(ScmChange {
            number: self.number,
            title: self.title,
            url: self.html_url,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            milestone: self.milestone.map(|m| m.title),
            timestamp,
            author: self.user.into(),
            closed_by: self.merged_by.map(ScmUser::from),
            commit_id: self.merge_commit_sha,
        })
    }
}
