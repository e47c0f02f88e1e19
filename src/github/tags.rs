use std::{collections::HashMap, error::Error as _, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use super::github_api_request_builder;
use crate::{
    env::{GITHUB_API_URL, GITHUB_TOKEN},
    framework::{StateError, StateResult, retry},
    resolver::{LookupError, Tag, TagSource},
};

/// The page size of tag listings, the largest GitHub allows.
pub const PER_PAGE: usize = 100;

/// Stops paginating after this many pages.
const MAX_PAGES: u32 = 50;

/// Lists tags through GitHub REST API.
///
/// Every listing is kept for the lifetime of the value (and its clones), so a repository is listed at most once.
#[derive(Debug, Clone)]
pub struct GithubTags {
    client: Client,
    api_url: String,
    token: Option<String>,
    cache: Arc<Mutex<HashMap<String, Vec<Tag>>>>,
}

impl Default for GithubTags {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubTags {
    /// Creates a lookup configured by the `GITHUB_API_URL` and `GITHUB_TOKEN` environment variables.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_url: GITHUB_API_URL.clone(),
            token: GITHUB_TOKEN.clone(),
            cache: Arc::default(),
        }
    }

    /// Talks to another API endpoint, such as a GitHub Enterprise Server instance.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Replaces the token, or makes requests anonymous with [`None`].
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Fetches a single page of the tags of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error that instructs retrying or cancelling if the request fails or the response is not a list
    /// of tags.
    async fn fetch_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> StateResult<Vec<Tag>, LookupError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/tags?per_page={PER_PAGE}&page={page}",
            self.api_url
        );
        debug!("fetching tags from {url}…");

        let request = github_api_request_builder(&self.client, &url, self.token.as_deref());
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!("failed to fetch tags from {url}: {err}");
                let transient = err.is_connect() || err.is_timeout();
                let err = LookupError::Http { url, source: err };
                return if transient {
                    Err(StateError::Retry(err))
                } else {
                    Err(StateError::Cancelled(err))
                };
            }
        };

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                error!("repository {owner}/{repo} not found at {url}!");
                return Err(StateError::Cancelled(LookupError::RepositoryNotFound {
                    owner: owner.to_owned(),
                    repo: repo.to_owned(),
                }));
            }
            status => {
                let code = status.as_u16();
                match status.canonical_reason() {
                    Some(reason) => error!("failed to fetch tags from {url}: {code} {reason}"),
                    None => error!("failed to fetch tags from {url}: {code}"),
                }
                let err = LookupError::Status { url, status: code };
                return match status {
                    StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                        Err(StateError::Retry(err))
                    }
                    _ if status.is_server_error() => Err(StateError::Retry(err)),
                    _ => Err(StateError::Cancelled(err)),
                };
            }
        }

        match response.json::<Vec<Tag>>().await {
            Ok(tags) => {
                debug!("fetched {} tags from {url}", tags.len());
                Ok(tags)
            }
            Err(err) => {
                error!("failed to parse data from {url}: {err}");

                if let Some(source) = err.source() {
                    error!("{source}")
                }

                Err(StateError::Retry(LookupError::Decode { url, source: err }))
            }
        }
    }

    /// Fetches every page of the tags of `owner/repo`, retrying each page on its own.
    async fn fetch_tags(&self, owner: &str, repo: &str) -> Result<Vec<Tag>, LookupError> {
        let mut tags = Vec::new();

        for page in 1..=MAX_PAGES {
            let name = format!("list tags of {owner}/{repo} (page {page})");
            let batch = retry(&name, move || self.fetch_page(owner, repo, page)).await?;
            let last = batch.len() < PER_PAGE;
            tags.extend(batch);
            if last {
                return Ok(tags);
            }
        }

        warn!("{owner}/{repo} has more than {} tags, ignoring the rest", tags.len());
        Ok(tags)
    }

    #[cfg(test)]
    fn remember(&self, owner: &str, repo: &str, tags: Vec<Tag>) {
        self.cache.lock().insert(format!("{owner}/{repo}"), tags);
    }
}

#[async_trait]
impl TagSource for GithubTags {
    async fn list_tags(&self, owner: &str, repo: &str) -> Result<Vec<Tag>, LookupError> {
        let key = format!("{owner}/{repo}");

        let cached = self.cache.lock().get(&key).cloned();
        if let Some(tags) = cached {
            debug!("reusing the tags of {key}");
            return Ok(tags);
        }

        let tags = self.fetch_tags(owner, repo).await?;
        info!("listed {} tags of {key}", tags.len());
        self.cache.lock().insert(key, tags.clone());
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on the discard port.
    const UNREACHABLE: &str = "http://127.0.0.1:9/";

    #[test]
    fn api_urls_lose_their_trailing_slash() {
        let tags = GithubTags::new().with_api_url(UNREACHABLE);
        assert_eq!(tags.api_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn listings_are_remembered() {
        let tags = GithubTags::new().with_api_url(UNREACHABLE).with_token(None);
        tags.remember(
            "actions",
            "checkout",
            vec![Tag::new("v4", "b4ffde65f46336ab88eb53be808477a3936bae11")],
        );

        let listed = tags
            .clone()
            .list_tags("actions", "checkout")
            .await
            .expect("listing is cached");
        assert_eq!(listed, [Tag::new("v4", "b4ffde65f46336ab88eb53be808477a3936bae11")]);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_apis_fail_after_retrying() {
        let tags = GithubTags::new().with_api_url(UNREACHABLE).with_token(None);

        let result = tags.list_tags("actions", "checkout").await;
        assert!(matches!(result, Err(LookupError::Http { .. })));
    }
}
