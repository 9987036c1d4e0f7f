use std::collections::HashMap;

use scm::commit::ScmChange;
use serde_derive::{Deserialize, Serialize};

use crate::attribution::Attribution;

pub const CLOSED_ISSUES: &str = "Closed Issues";
pub const MERGED_CHANGES: &str = "Merged Changes";

/// A titled section triggered by any of its labels.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LabelGroup {
    pub title: String,
    pub labels: Vec<String>,
}

impl LabelGroup {
    pub fn new(title: &str, labels: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChangeGroup {
    pub title: String,
    pub changes: Vec<ScmChange>,
}

pub fn default_groups() -> Vec<LabelGroup> {
    vec![
        LabelGroup::new("Security Fixes", &["security"]),
        LabelGroup::new("Breaking Changes", &["breaking", "backwards-incompatible"]),
        LabelGroup::new("Deprecated", &["deprecated"]),
        LabelGroup::new("Removed", &["removed"]),
        LabelGroup::new("Features", &["feature"]),
        LabelGroup::new("Enhancements", &["enhancement"]),
        LabelGroup::new("Fixed Bugs", &["bug"]),
        LabelGroup::new("Summary", &["summary"]),
    ]
}

/// Splits `changes` into the non-empty `groups`, in configured order, then a `catch_all` group
/// for whatever no group matched.
///
/// Each group selects from all of `changes`, so a change carrying labels of two groups is listed
/// in both. Only the catch-all is exclusive.
pub fn group_changes(
    changes: &[ScmChange],
    groups: &[LabelGroup],
    catch_all: &str,
) -> Vec<ChangeGroup> {
    let mut leftover = vec![true; changes.len()];
    let mut grouped = Vec::new();

    for group in groups {
        let mut selected = Vec::new();
        for (i, change) in changes.iter().enumerate() {
            if change.has_any_label(&group.labels) {
                selected.push(change.clone());
                leftover[i] = false;
            }
        }

        if !selected.is_empty() {
            grouped.push(ChangeGroup {
                title: group.title.clone(),
                changes: selected,
            });
        }
    }

    let rest: Vec<ScmChange> = changes
        .iter()
        .zip(leftover)
        .filter_map(|(change, left)| left.then(|| change.clone()))
        .collect();
    if !rest.is_empty() {
        grouped.push(ChangeGroup {
            title: catch_all.to_string(),
            changes: rest,
        });
    }

    grouped
}

/// [`group_changes`] for every tag of an attribution.
pub fn group_attribution(
    attribution: &Attribution,
    groups: &[LabelGroup],
    catch_all: &str,
) -> HashMap<String, Vec<ChangeGroup>> {
    attribution
        .iter()
        .map(|(tag, changes)| (tag.clone(), group_changes(changes, groups, catch_all)))
        .collect()
}
