use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

// TODO: should we have a CommitId type?
/// Commit as reported by the hosted platform. Content-addressed so two commits with the same
/// id are the same commit.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScmCommit {
    /// Commit hash
    pub id: String,

    /// The date of the commit
    pub timestamp: DateTime<Utc>,

    /// Hashes of the parent commits. Empty for a root commit.
    pub parents: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScmBranch {
    pub name: String,

    /// Hash of the commit at the tip of the branch
    pub head: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScmTag {
    /// The name of the tag
    pub name: String,

    /// When the tag was released. For tags pointing at a commit this is the commit time.
    pub timestamp: DateTime<Utc>,

    /// Commit the tag points at. `None` for a future tag that does not exist yet.
    pub commit_id: Option<String>,

    /// Web URL of the tag
    pub url: String,
}

impl ScmTag {
    /// A placeholder for an upcoming release, not backed by any commit.
    pub fn is_future(&self) -> bool {
        self.commit_id.is_none()
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScmUser {
    /// Login / username on the platform
    pub name: String,

    /// Profile URL
    pub url: String,
}

/// A closed issue or a merged change (pull request / merge request).
///
/// Both share this shape but are always kept in separate collections.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScmChange {
    pub number: u64,

    pub title: String,

    /// Web URL of the issue or change
    pub url: String,

    pub labels: Vec<String>,

    pub milestone: Option<String>,

    /// Close time for issues, merge time for merged changes.
    pub timestamp: DateTime<Utc>,

    pub author: ScmUser,

    /// Who closed the issue or merged the change, when the platform reports it.
    pub closed_by: Option<ScmUser>,

    /// Commit that landed a merged change. Always `None` for issues.
    pub commit_id: Option<String>,
}

impl ScmChange {
    pub fn has_any_label<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        self.labels
            .iter()
            .any(|label| labels.iter().any(|l| l.as_ref() == label))
    }
}
