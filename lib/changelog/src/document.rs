use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use lazy_static::lazy_static;
use minijinja::{context, Environment};
use regex::Regex;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::ChangelogResult;
use crate::groups::ChangeGroup;
use crate::release::Release;

pub const DEFAULT_HEADER: &str = "# Changelog";

const RELEASES_TEMPLATE: &str = r#"{% for release in releases %}
## [{{ release.name }}]({{ release.url }}) ({{ release.date }})

[Full Changelog]({{ release.compare_url }})

{% for group in release.groups %}
**{{ group.title }}:**

{% for change in group.changes %}
- {{ change.title }} [\#{{ change.number }}]({{ change.url }}) ([{{ change.author.name }}]({{ change.author.url }}))
{% endfor %}

{% endfor %}
{% endfor %}"#;

lazy_static! {
    static ref RELEASE_HEADING: Regex = Regex::new(
        r"(?m)^## \[(?P<tag>[^\]]+)\]\([^)]*\) \((?P<date>\d{4}-\d{2}-\d{2})\)[ \t]*\r?$"
    )
    .unwrap();
}

/// A release already written to the changelog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRelease {
    pub tag: String,

    /// Midnight UTC of the recorded release date
    pub timestamp: DateTime<Utc>,
}

/// An existing changelog split into the header, the recorded releases and everything from the
/// first release onward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangelogDocument {
    pub header: String,
    pub body: String,

    /// Newest-first, in document order
    pub releases: Vec<RecordedRelease>,
}

#[derive(Serialize)]
struct ReleaseView<'a> {
    name: &'a str,
    url: &'a str,
    date: String,
    compare_url: &'a str,
    groups: Vec<&'a ChangeGroup>,
}

impl<'a> From<&'a Release> for ReleaseView<'a> {
    fn from(release: &'a Release) -> Self {
        Self {
            name: &release.tag.name,
            url: &release.tag.url,
            date: release.tag.timestamp.format("%Y-%m-%d").to_string(),
            compare_url: &release.compare_url,
            groups: release.issues.iter().chain(release.merges.iter()).collect(),
        }
    }
}

impl ChangelogDocument {
    pub fn parse(text: &str) -> Self {
        let Some(first) = RELEASE_HEADING.find(text) else {
            return Self {
                header: text.to_string(),
                ..Default::default()
            };
        };

        let mut releases = Vec::new();
        for captures in RELEASE_HEADING.captures_iter(text) {
            let tag = &captures["tag"];
            match NaiveDate::parse_from_str(&captures["date"], "%Y-%m-%d") {
                Ok(date) => releases.push(RecordedRelease {
                    tag: tag.to_string(),
                    timestamp: date.and_time(NaiveTime::MIN).and_utc(),
                }),
                Err(e) => warn!("skipping release {tag} with invalid date: {e}"),
            }
        }

        debug!("changelog records {} releases", releases.len());
        Self {
            header: text[..first.start()].to_string(),
            body: text[first.start()..].to_string(),
            releases,
        }
    }

    /// Reads the changelog at `path`. A missing file is an empty changelog.
    pub fn load<P: AsRef<Path>>(path: P) -> ChangelogResult<Self> {
        match fs::read_to_string(path.as_ref()) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no changelog at {}", path.as_ref().display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The whole document with `releases` placed above the recorded ones.
    pub fn render(&self, releases: &[Release]) -> ChangelogResult<String> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("releases", RELEASES_TEMPLATE)?;

        let views: Vec<ReleaseView> = releases.iter().map(ReleaseView::from).collect();
        let rendered = env
            .get_template("releases")?
            .render(context! { releases => views })?;

        let header = match self.header.trim_end() {
            "" => DEFAULT_HEADER,
            header => header,
        };

        let mut text = format!("{header}\n\n{rendered}{}", self.body);
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
        text.push('\n');
        Ok(text)
    }

    /// Replaces `path` with `text` in one step so a failure never leaves a partial file.
    pub fn write<P: AsRef<Path>>(path: P, text: &str) -> ChangelogResult<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.persist(path)?;
        Ok(())
    }
}
