// Only GET is needed to read a repository so there is no body / media type handling.
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use crate::errors::{ScmError, ScmResult};

const USER_AGENT: &str = concat!("chlog/", env!("CARGO_PKG_VERSION"));

lazy_static! {
    static ref NEXT_LINK_REGEX: Regex = Regex::new(r#"<([^>]+)>;\s*rel="next""#).unwrap();
    static ref LAST_LINK_REGEX: Regex = Regex::new(r#"<([^>]+)>;\s*rel="last""#).unwrap();
}

#[derive(Debug)]
pub(crate) struct Response<T> {
    pub headers: HeaderMap,
    pub body: T,
}

#[derive(Clone, Debug)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub(crate) fn new(headers: HeaderMap) -> ScmResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    pub(crate) async fn get<D>(&self, url: Url, cancel: &CancellationToken) -> ScmResult<Response<D>>
    where
        D: DeserializeOwned,
    {
        debug!("GET {url}");
        let request = async {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let response_body = response.bytes().await?;

            if status.is_success() {
                trace!("Received successful response ({status}). Read payload.");
                let body = serde_json::from_slice::<D>(&response_body)?;
                Ok(Response { headers, body })
            } else if response_body.is_empty() {
                Err(ScmError::HttpError {
                    status,
                    error: "empty response".into(),
                })
            } else {
                Err(ScmError::HttpError {
                    status,
                    error: String::from_utf8_lossy(&response_body).into(),
                })
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScmError::Cancelled),
            result = request => result,
        }
    }

    /// Follows pages until `next_page` returns `None`.
    pub(crate) async fn get_all<D, F>(
        &self,
        url: Url,
        next_page: F,
        cancel: &CancellationToken,
    ) -> ScmResult<Vec<D>>
    where
        D: DeserializeOwned,
        F: Fn(&Url, &HeaderMap) -> Option<Url>,
    {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let response = self.get::<Vec<D>>(url.clone(), cancel).await?;
            next = next_page(&url, &response.headers);
            items.extend(response.body);
        }

        Ok(items)
    }
}

/// `rel="next"` target of a GitHub style `Link` header.
pub(crate) fn next_link(_current: &Url, headers: &HeaderMap) -> Option<Url> {
    link_with(&NEXT_LINK_REGEX, headers)
}

/// `rel="last"` target of a GitHub style `Link` header.
pub(crate) fn last_link(headers: &HeaderMap) -> Option<Url> {
    link_with(&LAST_LINK_REGEX, headers)
}

fn link_with(regex: &Regex, headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    regex
        .captures(link)
        .and_then(|captures| captures.get(1))
        .and_then(|m| Url::parse(m.as_str()).ok())
}

/// Next page from GitLab's `x-next-page` header, which is empty on the last page.
pub(crate) fn next_page_header(current: &Url, headers: &HeaderMap) -> Option<Url> {
    let page = header_number(headers, "x-next-page")?;
    Some(with_page(current, page))
}

pub(crate) fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// `Url::join` treats the last segment as a file unless it ends in a slash.
pub(crate) fn as_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Replaces (or adds) the `page` query parameter.
pub(crate) fn with_page(url: &Url, page: u64) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("page", &page.to_string());
    url
}
