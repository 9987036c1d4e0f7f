use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::commit::{ScmChange, ScmCommit, ScmUser};

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabProject {
    pub default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabCommit {
    pub id: String,
    pub committed_date: DateTime<Utc>,
    #[serde(default)]
    pub parent_ids: Vec<String>,
}

impl From<GitlabCommit> for ScmCommit {
    fn from(value: GitlabCommit) -> Self {
        Self {
            id: value.id,
            timestamp: value.committed_date,
            parents: value.parent_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabBranch {
    pub name: String,
    pub commit: GitlabCommit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabTag {
    pub name: String,
    pub commit: GitlabCommit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabUser {
    pub username: String,
    pub web_url: String,
}

impl From<GitlabUser> for ScmUser {
    fn from(value: GitlabUser) -> Self {
        Self {
            name: value.username,
            url: value.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabMilestone {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabIssue {
    pub iid: u64,
    pub title: String,
    pub web_url: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub milestone: Option<GitlabMilestone>,
    pub author: GitlabUser,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<GitlabUser>,
}

impl GitlabIssue {
    pub(crate) fn into_change(self) -> Option<ScmChange> {
        let timestamp = self.closed_at?;
        Some(ScmChange {
            number: self.iid,
            title: self.title,
            url: self.web_url,
            labels: self.labels,
            milestone: self.milestone.map(|m| m.title),
            timestamp,
            author: self.author.into(),
            closed_by: self.closed_by.map(ScmUser::from),
            commit_id: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitlabMergeRequest {
    pub iid: u64,
    pub title: String,
    pub web_url: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub milestone: Option<GitlabMilestone>,
    pub author: GitlabUser,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged_by: Option<GitlabUser>,
    pub merge_commit_sha: Option<String>,
    pub squash_commit_sha: Option<String>,
}

impl GitlabMergeRequest {
    pub(crate) fn into_change(self) -> Option<ScmChange> {
        let timestamp = self.merged_at?;
        Some(ScmChange {
            number: self.iid,
            title: self.title,
            url: self.web_url,
            labels: self.labels,
            milestone: self.milestone.map(|m| m.title),
            timestamp,
            author: self.author.into(),
            closed_by: self.merged_by.map(ScmUser::from),
            // fast-forward merges of squashed requests have no merge commit
            commit_id: self.merge_commit_sha.or(self.squash_commit_sha),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::commit::ScmCommit;
    use crate::platforms::gitlab::models::{GitlabCommit, GitlabMergeRequest};

    #[test]
    fn commit_keeps_parents() {
        let commit: GitlabCommit = serde_json::from_str(
            r#"{
                "id": "c2",
                "committed_date": "2024-03-01T10:00:00Z",
                "parent_ids": ["c1"]
            }"#,
        )
        .unwrap();
        assert_eq!(vec!["c1"], ScmCommit::from(commit).parents);
    }

    #[test]
    fn squash_commit_used_without_merge_commit() {
        let mr: GitlabMergeRequest = serde_json::from_str(
            r#"{
                "iid": 12,
                "title": "Speed up parser",
                "web_url": "https://gitlab.com/g/p/-/merge_requests/12",
                "labels": ["enhancement"],
                "milestone": null,
                "author": {"username": "dev", "web_url": "https://gitlab.com/dev"},
                "merged_at": "2024-03-01T10:00:00Z",
                "merged_by": {"username": "lead", "web_url": "https://gitlab.com/lead"},
                "merge_commit_sha": null,
                "squash_commit_sha": "def456"
            }"#,
        )
        .unwrap();

        let change = mr.into_change().unwrap();
        assert_eq!(Some("def456".to_string()), change.commit_id);
        assert_eq!("lead", change.closed_by.unwrap().name);
    }
}
