use std::path::PathBuf;

use regex::Regex;
use scm::platforms::ScmRemote;
use serde_derive::{Deserialize, Serialize};

use crate::groups::{default_groups, LabelGroup};
use crate::tags::TagRange;

pub const DEFAULT_CHANGELOG_FILE: &str = "CHANGELOG.md";

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ChangelogSettings {
    /// Changelog to read and update
    pub file: PathBuf,

    /// Release branch. Defaults to the repository's default branch.
    pub branch: Option<String>,

    /// Tags to ignore by name
    pub exclude_tags: Vec<String>,

    /// Regex to ignore matched tags
    #[serde(with = "serde_regex")]
    pub exclude_tags_regex: Option<Regex>,

    /// Oldest tag to generate
    pub from: Option<String>,

    /// Newest tag to generate
    pub to: Option<String>,

    /// Name of the upcoming release unreleased changes are listed under
    pub future: Option<String>,

    /// Issues and changes with any of these labels are left out
    pub exclude_labels: Vec<String>,

    pub issue_groups: Vec<LabelGroup>,

    pub merge_groups: Vec<LabelGroup>,

    pub remote: ScmRemote,
}

impl Default for ChangelogSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_CHANGELOG_FILE),
            branch: None,
            exclude_tags: Vec::new(),
            exclude_tags_regex: None,
            from: None,
            to: None,
            future: None,
            exclude_labels: ["duplicate", "question", "invalid", "wontfix"]
                .iter()
                .map(|l| l.to_string())
                .collect(),
            issue_groups: default_groups(),
            merge_groups: default_groups(),
            remote: ScmRemote::default(),
        }
    }
}

impl ChangelogSettings {
    pub fn tag_range(&self) -> TagRange {
        TagRange {
            from: self.from.clone(),
            to: self.to.clone(),
            future: self.future.clone(),
        }
    }
}
