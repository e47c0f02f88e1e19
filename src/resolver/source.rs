//! The remote tag lookup the resolver pins references against.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// A tag of a repository, as listed by GitHub REST API.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Tag {
    /// The tag name, such as `v4`.
    pub name: String,
    /// The commit the tag points at.
    pub commit: TagCommit,
}

impl Tag {
    /// Creates a tag pointing at a commit.
    pub fn new(name: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit: TagCommit { sha: sha.into() },
        }
    }
}

/// The commit a [`Tag`] points at.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TagCommit {
    /// The full commit SHA.
    pub sha: String,
}

/// Errors of a tag lookup, surfaced once its retries are exhausted.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LookupError {
    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an unexpected status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The repository does not exist or is not visible with the configured token.
    #[error("repository {owner}/{repo} not found")]
    RepositoryNotFound { owner: String, repo: String },

    /// The response was not a list of tags.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any other failure of a custom [`TagSource`].
    #[error("{0}")]
    Other(String),
}

/// Lists the tags of repositories.
///
/// Implementations may cache listings, but must never return a stale listing for a repository they have not
/// listed before.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Lists every tag of `owner/repo`, in the order the remote returns them.
    async fn list_tags(&self, owner: &str, repo: &str) -> Result<Vec<Tag>, LookupError>;
}

#[async_trait]
impl<T> TagSource for &T
where
    T: TagSource + ?Sized,
{
    async fn list_tags(&self, owner: &str, repo: &str) -> Result<Vec<Tag>, LookupError> {
        (**self).list_tags(owner, repo).await
    }
}
