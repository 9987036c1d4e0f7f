use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::commit::{ScmBranch, ScmChange, ScmCommit, ScmTag};
use crate::errors::{ScmError, ScmResult};
use crate::platforms::github::models::{
    GithubBranch, GithubCommit, GithubIssue, GithubPull, GithubRepository, GithubTag,
};
use crate::platforms::http::{as_base, last_link, next_link, HttpClient};
use crate::platforms::{IssuesAndMerges, ScmPlatformClient};

const GITHUB_API: &str = "https://api.github.com/";
const GITHUB_WEB: &str = "https://github.com/";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const PER_PAGE: &str = "100";

pub struct GithubProvider {
    owner: String,
    repository: String,
    api: Url,
    web: Url,
    http: HttpClient,
}

impl GithubProvider {
    pub fn new(
        owner: &str,
        repository: &str,
        token: Option<&str>,
        api: Option<Url>,
        web: Option<Url>,
    ) -> ScmResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            GITHUB_API_VERSION_HEADER,
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            owner: owner.to_string(),
            repository: repository.to_string(),
            api: as_base(api.map_or_else(|| Url::parse(GITHUB_API), Ok)?),
            web: as_base(web.map_or_else(|| Url::parse(GITHUB_WEB), Ok)?),
            http: HttpClient::new(headers)?,
        })
    }

    fn repo_url(&self, path: &str, query: &[(&str, &str)]) -> ScmResult<Url> {
        let mut url = self
            .api
            .join(&format!("repos/{}/{}{}", self.owner, self.repository, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn web_url(&self, path: &str) -> String {
        format!("{}{}/{}/{}", self.web, self.owner, self.repository, path)
    }

    async fn fetch_commit(&self, sha: &str, cancel: &CancellationToken) -> ScmResult<ScmCommit> {
        let url = self.repo_url(&format!("/commits/{sha}"), &[])?;
        let commit = self.http.get::<GithubCommit>(url, cancel).await?.body;
        Ok(commit.into())
    }

    /// Closed pull requests come back most recently updated first so paging stops once a page
    /// ends before `since`.
    async fn fetch_merged_pulls(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmChange>> {
        let mut merges = Vec::new();
        let mut next = Some(self.repo_url(
            "/pulls",
            &[
                ("state", "closed"),
                ("sort", "updated"),
                ("direction", "desc"),
                ("per_page", PER_PAGE),
            ],
        )?);

        while let Some(url) = next {
            let response = self.http.get::<Vec<GithubPull>>(url.clone(), cancel).await?;
            next = next_link(&url, &response.headers);

            let exhausted = match (since, response.body.last()) {
                (Some(since), Some(last)) => last.updated_at < since,
                _ => false,
            };

            merges.extend(response.body.into_iter().filter_map(GithubPull::into_change));
            if exhausted {
                break;
            }
        }

        Ok(merges)
    }
}

#[async_trait::async_trait]
impl ScmPlatformClient for GithubProvider {
    async fn fetch_default_branch(&self, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        let url = self.repo_url("", &[])?;
        let repository = self.http.get::<GithubRepository>(url, cancel).await?.body;
        self.fetch_branch(&repository.default_branch, cancel).await
    }

    async fn fetch_branch(&self, name: &str, cancel: &CancellationToken) -> ScmResult<ScmBranch> {
        let url = self.repo_url(&format!("/branches/{name}"), &[])?;
        let branch = self.http.get::<GithubBranch>(url, cancel).await?.body;
        Ok(ScmBranch {
            name: branch.name,
            head: branch.commit.sha,
        })
    }

    async fn fetch_tags(&self, cancel: &CancellationToken) -> ScmResult<Vec<ScmTag>> {
        let url = self.repo_url("/tags", &[("per_page", PER_PAGE)])?;
        let github_tags: Vec<GithubTag> = self.http.get_all(url, next_link, cancel).await?;
        debug!("fetched {} tags", github_tags.len());

        // the tags endpoint only carries the sha so the release time comes from the commit
        let mut tags = Vec::with_capacity(github_tags.len());
        for tag in github_tags {
            let commit = self.fetch_commit(&tag.commit.sha, cancel).await?;
            tags.push(ScmTag {
                url: self.web_url(&format!("tree/{}", tag.name)),
                name: tag.name,
                timestamp: commit.timestamp,
                commit_id: Some(commit.id),
            });
        }

        Ok(tags)
    }

    async fn fetch_first_commit(&self, cancel: &CancellationToken) -> ScmResult<ScmCommit> {
        let branch = self.fetch_default_branch(cancel).await?;
        let url = self.repo_url(
            "/commits",
            &[("sha", branch.head.as_str()), ("per_page", "1")],
        )?;

        let response = self.http.get::<Vec<GithubCommit>>(url, cancel).await?;
        let commits = match last_link(&response.headers) {
            Some(last) => self.http.get::<Vec<GithubCommit>>(last, cancel).await?.body,
            None => response.body,
        };

        commits
            .into_iter()
            .last()
            .map(ScmCommit::from)
            .ok_or_else(|| ScmError::NotFound("first commit".to_string()))
    }

    async fn fetch_parent_commits(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<ScmCommit>> {
        let url = self.repo_url("/commits", &[("sha", reference), ("per_page", PER_PAGE)])?;
        let commits: Vec<GithubCommit> = self.http.get_all(url, next_link, cancel).await?;
        Ok(commits.into_iter().map(ScmCommit::from).collect())
    }

    async fn fetch_issues_and_merges(
        &self,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> ScmResult<IssuesAndMerges> {
        let since_param = since.map(|s| s.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut query = vec![("state", "closed"), ("per_page", PER_PAGE)];
        if let Some(since) = since_param.as_deref() {
            query.push(("since", since));
        }

        let url = self.repo_url("/issues", &query)?;
        let issues: Vec<GithubIssue> = self.http.get_all(url, next_link, cancel).await?;
        let issues: Vec<ScmChange> = issues
            .into_iter()
            .filter_map(GithubIssue::into_change)
            .collect();

        let merges = self.fetch_merged_pulls(since, cancel).await?;
        debug!(
            "fetched {} closed issues and {} merged pull requests",
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
            url: self.web_url(&format!("tree/{name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use crate::platforms::github::GithubProvider;
    use crate::platforms::ScmPlatformClient;

    #[test]
    fn compare_url() {
        let provider = GithubProvider::new("o", "r", None, None, None).unwrap();
        assert_eq!(
            "https://github.com/o/r/compare/v0.1.1...v0.1.2",
            provider.compare_url("v0.1.1", "v0.1.2")
        );
    }

    #[test]
    fn future_tag_links_to_tree() {
        let provider = GithubProvider::new("o", "r", Some("token"), None, None).unwrap();
        let tag = provider.future_tag("v0.2.0");
        assert!(tag.is_future());
        assert_eq!("https://github.com/o/r/tree/v0.2.0", tag.url);
    }

    #[test]
    fn enterprise_urls() {
        let provider = GithubProvider::new(
            "o",
            "r",
            None,
            Some(Url::parse("https://ghe.example.com/api/v3").unwrap()),
            Some(Url::parse("https://ghe.example.com").unwrap()),
        )
        .unwrap();

        assert_eq!(
            "https://ghe.example.com/api/v3/repos/o/r/tags?per_page=100",
            provider
                .repo_url("/tags", &[("per_page", "100")])
                .unwrap()
                .as_str()
        );
        assert_eq!(
            "https://ghe.example.com/o/r/compare/a...b",
            provider.compare_url("a", "b")
        );
    }
}
