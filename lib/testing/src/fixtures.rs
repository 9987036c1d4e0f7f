use chrono::{DateTime, TimeZone, Utc};
use scm::commit::{ScmChange, ScmUser};

/// Seconds since the epoch as a UTC timestamp.
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture timestamp {seconds}"))
}

fn user(name: &str) -> ScmUser {
    ScmUser {
        name: name.to_string(),
        url: format!("https://example.com/{name}"),
    }
}

/// Closed issue.
pub fn issue(number: u64, labels: &[&str], closed_at: i64) -> ScmChange {
    ScmChange {
        number,
        title: format!("issue {number}"),
        url: format!("https://example.com/issues/{number}"),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        milestone: None,
        timestamp: at(closed_at),
        author: user("reporter"),
        closed_by: Some(user("maintainer")),
        commit_id: None,
    }
}

/// Merged change landed by `commit`.
pub fn merged(number: u64, labels: &[&str], merged_at: i64, commit: &str) -> ScmChange {
    ScmChange {
        number,
        title: format!("change {number}"),
        url: format!("https://example.com/pull/{number}"),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        milestone: None,
        timestamp: at(merged_at),
        author: user("contributor"),
        closed_by: Some(user("maintainer")),
        commit_id: Some(commit.to_string()),
    }
}
