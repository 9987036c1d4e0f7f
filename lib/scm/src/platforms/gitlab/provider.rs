use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::commit::{ScmBranch, ScmChange, ScmCommit, ScmTag};
use crate::errors::{ScmError, ScmResult};
use crate::platforms::gitlab::models::{
    GitlabBranch, GitlabCommit, GitlabIssue, GitlabMergeRequest, GitlabProject, GitlabTag,
};
use crate::platforms::http::{as_base, header_number, next_page_header, with_page, HttpClient};
use crate::platforms::{IssuesAndMerges, ScmPlatformClient};

const GITLAB_API: &str = "https://gitlab.com/api/v4/";
const GITLAB_WEB: &str = "https://gitlab.com/";
const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const PER_PAGE: &str = "100";

// project paths and refs go into a single path segment so '/' must be encoded as well
const PATH_SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT_SET).to_string()
}

pub struct GitlabProvider {
    owner: String,
    repository: String,
    project_id: String,
    api: Url,
    web: Url,
    http: HttpClient,
}

impl GitlabProvider {
    pub fn new(
        owner: &str,
        repository: &str,
        token: Option<&str>,
        api: Option<Url>,
        web: Option<Url>,
    ) -> ScmResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(token)?;
            value.set_sensitive(true);
            headers.insert(PRIVATE_TOKEN_HEADER, value);
        }

        Ok(Self {
            owner: owner.to_string(),
            repository: repository.to_string(),
            project_id: encode_segment(&format!("{owner}/{repository}")),
            api: as_base(api.map_or_else(|| Url::parse(GITLAB_API), Ok)?),
            web: as_base(web.map_or_else(|| Url::parse(GITLAB_WEB), Ok)?),
            http: HttpClient::new(headers)?,
        })
    }

    fn project_url(&self, path: &str, query: &[(&str, &str)]) -> ScmResult<Url> {
        let mut url = self
            .api
            .join(&format!("projects/{}{}", self.project_id, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn web_url(&self, path: &str) -> String {
        format!("{}{}/{}/-/{}", self.web, self.owner, self.repository, path)
    }
}

#[async_trait::async_trait]
impl ScmPlatformClient for GitlabProvider {
    async fn fetch_default_branch(&self, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        let url = self.project_url("", &[])?;
        let project = self.http.get::<GitlabProject>(url, cancel).await?.body;
        let name = project
            .default_branch
            .ok_or_else(|| ScmError::NotFound("default branch".to_string()))?;
        self.fetch_branch(&name, cancel).await
    }

    async fn fetch_branch(&self, name: &str, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        let url = self.project_url(
            &format!("/repository/branches/{}", encode_segment(name)),
            &[],
        )?;
        let branch = self.http.get::<GitlabBranch>(url, cancel).await?.body;
        Ok(ScmBranch {
            name: branch.name,
            head: branch.commit.id,
        })
    }

    async fn fetch_tags(&self, cancel: &CancellationToken) -> ScmResult<Vec<ScmTag>> {
        let url = self.project_url("/repository/tags", &[("per_page", PER_PAGE)])?;
        let tags: Vec<GitlabTag> = self.http.get_all(url, next_page_header, cancel).await?;
        debug!("fetched {} tags", tags.len());

        Ok(tags
            .into_iter()
            .map(|tag| ScmTag {
                url: self.web_url(&format!("tags/{}", tag.name)),
                name: tag.name,
                timestamp: tag.commit.committed_date,
                commit_id: Some(tag.commit.id),
            })
            .collect())
    }

    async fn fetch_first_commit(&self, cancel: &CancellationToken) -> ScmResult<ScmCommit> {
        let branch = self.fetch_default_branch(cancel).await?;
        let url = self.project_url(
            "/repository/commits",
            &[("ref_name", branch.head.as_str()), ("per_page", "1")],
        )?;

        let response = self.http.get::<Vec<GitlabCommit>>(url.clone(), cancel).await?;
        let first = match header_number(&response.headers, "x-total-pages") {
            Some(total) if total > 1 => {
                self.http
                    .get::<Vec<GitlabCommit>>(with_page(&url, total), cancel)
                    .await?
                    .body
                    .into_iter()
                    .last()
                    .map(ScmCommit::from)
            }
            Some(_) => response.body.into_iter().last().map(ScmCommit::from),
            // GitLab stops reporting totals for very large listings
            None => self
                .fetch_parent_commits(&branch.head, cancel)
                .await?
                .into_iter()
                .last(),
        };

        first.ok_or_else(|| ScmError::NotFound("first commit".to_string()))
    }

    async fn fetch_parent_commits(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmCommit>> {
        let url = self.project_url(
            "/repository/commits",
            &[("ref_name", reference), ("per_page", PER_PAGE)],
        )?;
        let commits: Vec<GitlabCommit> = self.http.get_all(url, next_page_header, cancel).await?;
        Ok(commits.into_iter().map(ScmCommit::from).collect())
    }

    async fn fetch_issues_and_merges(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<IssuesAndMerges> {
        let since_param = since.map(|s| s.to_rfc3339_opts(SecondsFormat::Secs, true));

        let mut issue_query = vec![("state", "closed"), ("per_page", PER_PAGE)];
        let mut merge_query = vec![("state", "merged"), ("per_page", PER_PAGE)];
        if let Some(since) = since_param.as_deref() {
            issue_query.push(("updated_after", since));
            merge_query.push(("updated_after", since));
        }

        let url = self.project_url("/issues", &issue_query)?;
        let issues: Vec<GitlabIssue> = self.http.get_all(url, next_page_header, cancel).await?;
        let issues: Vec<ScmChange> = issues
            .into_iter()
            .filter_map(GitlabIssue::into_change)
            .collect();

        let url = self.project_url("/merge_requests", &merge_query)?;
        let merges: Vec<GitlabMergeRequest> =
            self.http.get_all(url, next_page_header, cancel).await?;
        let merges: Vec<ScmChange> = merges
            .into_iter()
            .filter_map(GitlabMergeRequest::into_change)
            .collect();

        debug!(
            "fetched {} closed issues and {} merged merge requests",
            issues.len(),
            merges.len()
        );

        Ok(IssuesAndMerges { issues, merges })
    }

    fn compare_url(&self, base: &str, head: &str) -> String {
        self.web_url(&format!("compare/{base}...{head}"))
    }

    fn future_tag(&self, name: &str) -> ScmTag {
        ScmTag {
            name: name.to_string(),
            timestamp: Utc::now(),
            commit_id: None,
            url: self.web_url(&format!("tags/{name}")),
        }
    }
}
