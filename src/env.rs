//! Defines the environment variables to use.

#![cfg(feature = "env")]

use crate::static_lazy_lock;

use std::env;

/// Parses an environment variable from [`String`] to something else, wrapping any error in [`anyhow::Error`].
#[macro_export]
macro_rules! parse_env {
    ($key:expr => |$var:ident| $expr:expr) => {
        std::env::var($key)
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|$var| $expr)
    };
    ($key:expr => |$var:ident| $expr:expr; anyhow) => {
        parse_env!($key => |$var| $expr.map_err(|e| anyhow::anyhow!(e)))
    };
}

pub use parse_env;

/// The default endpoint of GitHub REST API.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

static_lazy_lock! {
    /// The base URL of GitHub REST API, without a trailing slash.
    ///
    /// Overridable through `GITHUB_API_URL` for GitHub Enterprise Server instances.
    pub GITHUB_API_URL: String = env::var("GITHUB_API_URL")
        .map(|url| url.trim_end_matches('/').to_owned())
        .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_owned());
}

#[cfg(feature = "env_github_token")]
static_lazy_lock! {
    /// The GitHub token. Tag lookups are anonymous (and heavily rate limited) when unset.
    pub GITHUB_TOKEN: Option<String> =
        env::var("GITHUB_TOKEN").ok().filter(|token| !token.is_empty());
}

#[cfg(feature = "env_max_retries")]
static_lazy_lock! {
    /// The maximum retry limit for a single tag lookup.
    pub MAX_RETRIES: u8 = parse_env!("MAX_RETRIES" => |s| s.parse::<u8>(); anyhow).unwrap_or(5);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_reports_missing_variables() {
        let parsed = parse_env!("GAT_SURELY_UNSET_VARIABLE" => |s| s.parse::<u8>(); anyhow);
        assert!(parsed.is_err());
    }

    #[test]
    fn api_url_has_no_trailing_slash() {
        assert!(!GITHUB_API_URL.ends_with('/'));
    }
}
