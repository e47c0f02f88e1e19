//! GitHub REST API and the tag lookup built on it.

#![cfg(feature = "github")]

use std::time::Duration;

use reqwest::{Client, RequestBuilder, header};

mod tags;

pub use tags::GithubTags;

/// The version of GitHub REST API requests are made against.
pub const API_VERSION: &str = "2022-11-28";

/// The user agent of every request. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("gat/", env!("CARGO_PKG_VERSION"));

/// The longest a single request may take.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds a request for GitHub REST API, authenticated if a token is given.
pub fn github_api_request_builder(
    client: &Client,
    url: &str,
    token: Option<&str>,
) -> RequestBuilder {
    let builder = client
        .get(url)
        .header(header::ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", API_VERSION)
        .header(header::USER_AGENT, USER_AGENT)
        .timeout(REQUEST_TIMEOUT);

    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_carry_github_headers() {
        let client = Client::new();
        let url = "https://api.github.com/repos/a/b/tags";

        let request = github_api_request_builder(&client, url, Some("t0ken"))
            .build()
            .expect("request builds");
        let headers = request.headers();
        assert_eq!(headers[header::ACCEPT], "application/vnd.github+json");
        assert_eq!(headers["X-GitHub-Api-Version"], API_VERSION);
        assert_eq!(headers[header::AUTHORIZATION], "Bearer t0ken");
        assert!(headers[header::USER_AGENT].to_str().expect("ascii").starts_with("gat/"));

        let anonymous = github_api_request_builder(&client, url, None)
            .build()
            .expect("request builds");
        assert!(!anonymous.headers().contains_key(header::AUTHORIZATION));
    }
}
