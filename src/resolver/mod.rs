//! Pins symbolic action references to immutable commits.
//!
//! A tag like `v4` can be repointed after a workflow was reviewed. The [`Resolver`] rewrites every `owner/repo@tag`
//! reference into `owner/repo@<commit sha>`, reusing the [`ActionPinMapping`] of the lock file and asking a
//! [`TagSource`] only for references it has never seen.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
    sync::Arc,
};

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub mod lock;
mod reference;
pub mod source;

pub use lock::{ActionPinMapping, LockError};
pub use reference::{ActionReference, is_commit_sha};
pub use source::{LookupError, Tag, TagSource};

/// Why a reference could not be pinned.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Unresolvable {
    /// The repository has no tag with the requested name.
    #[error("no such tag")]
    TagNotFound,

    /// Listing the tags of the repository failed, even after retrying.
    #[error("tag lookup failed: {0}")]
    Lookup(#[source] Arc<LookupError>),
}

/// Errors of a resolution pass.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference cannot be pinned to a commit.
    #[error("unable to pin {reference} (version `{version}` of {repository}): {reason}")]
    UnresolvableReference {
        reference: String,
        repository: String,
        version: String,
        #[source]
        reason: Unresolvable,
    },

    /// The reference is missing from the lock file and looking it up is not allowed.
    #[error("{reference} is not pinned in the lock file and network lookups are disabled")]
    MissingLockEntry { reference: String },

    /// More than one reference failed.
    #[error("{}", ErrorList(.0))]
    Multiple(Vec<ResolveError>),
}

impl ResolveError {
    /// Turns the failures of a pass into its result.
    fn from_failures(mut failures: Vec<Self>) -> Result<(), Self> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Self::Multiple(failures)),
        }
    }

    /// The symbolic references that failed.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::UnresolvableReference { reference, .. }
            | Self::MissingLockEntry { reference } => vec![reference.as_str()],
            Self::Multiple(errors) => errors.iter().flat_map(Self::references).collect(),
        }
    }
}

struct ErrorList<'a>(&'a [ResolveError]);

impl Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} action references cannot be pinned:", self.0.len())?;
        for error in self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// Whether a resolution pass may look references up.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolveMode {
    /// Looks up references missing from the mapping.
    #[default]
    Online,
    /// Never looks anything up: every reference must already be pinned. Used to verify committed workflows.
    Locked,
}

/// Pins action references using a [`TagSource`].
#[derive(Debug, Clone)]
pub struct Resolver<S> {
    source: S,
    mode: ResolveMode,
}

impl<S> Resolver<S>
where
    S: TagSource,
{
    /// Creates a resolver.
    pub fn new(source: S, mode: ResolveMode) -> Self {
        Self { source, mode }
    }

    /// The mode of the resolver.
    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    /// Pins every distinct reference into the mapping.
    ///
    /// References that are not remote actions are left alone. References already pinned to a commit map to
    /// themselves, whatever the mapping said before. References already in the mapping are reused as is. The rest are looked up, one listing per
    /// repository, all repositories at once.
    ///
    /// # Errors
    ///
    /// Returns every reference that could not be pinned. The mapping keeps the references that could.
    pub async fn resolve<'r, I>(
        &self,
        references: I,
        pins: &mut ActionPinMapping,
    ) -> Result<(), ResolveError>
    where
        I: IntoIterator<Item = &'r str>,
    {
        let references: BTreeSet<&str> = references.into_iter().collect();
        let mut pending: BTreeMap<(&str, &str), Vec<ActionReference<'r>>> = BTreeMap::new();
        let mut failures = Vec::new();

        for reference in references {
            let Some(action) = ActionReference::parse(reference) else {
                debug!("{reference} is not a remote action, leaving it as is");
                continue;
            };

            if action.is_pinned() {
                debug!("{reference} is already pinned to a commit");
                let previous = pins.replace(reference, reference);
                if let Some(previous) = previous.filter(|previous| previous != reference) {
                    warn!("lock file maps {reference} to {previous}, keeping the commit");
                }
            } else if let Some(pinned) = pins.get(reference) {
                debug!("reusing {pinned} for {reference}");
            } else if self.mode == ResolveMode::Locked {
                error!("{reference} is missing from the lock file");
                failures.push(ResolveError::MissingLockEntry {
                    reference: reference.to_owned(),
                });
            } else {
                pending
                    .entry((action.owner(), action.repo()))
                    .or_default()
                    .push(action);
            }
        }

        let source = &self.source;
        let lookups = pending.into_iter().map(|((owner, repo), actions)| async move {
            info!("looking up tags of {owner}/{repo}…");
            (actions, source.list_tags(owner, repo).await)
        });

        for (actions, listing) in join_all(lookups).await {
            match listing {
                Ok(tags) => {
                    for action in actions {
                        match tags.iter().find(|tag| tag.name == action.version) {
                            Some(tag) => {
                                let pinned =
                                    pins.insert(action.reference, action.pin(&tag.commit.sha));
                                info!("pinned {} to {pinned}", action.reference);
                            }
                            None => {
                                error!("{} has no tag {}", action.repository, action.version);
                                failures.push(unresolvable(&action, Unresolvable::TagNotFound));
                            }
                        }
                    }
                }
                Err(err) => {
                    let err = Arc::new(err);
                    for action in actions {
                        let reason = Unresolvable::Lookup(Arc::clone(&err));
                        failures.push(unresolvable(&action, reason));
                    }
                }
            }
        }

        ResolveError::from_failures(failures)
    }
}

fn unresolvable(action: &ActionReference<'_>, reason: Unresolvable) -> ResolveError {
    ResolveError::UnresolvableReference {
        reference: action.reference.to_owned(),
        repository: action.repository.to_owned(),
        version: action.version.to_owned(),
        reason,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    pub(crate) const CHECKOUT_SHA: &str = "b4ffde65f46336ab88eb53be808477a3936bae11";
    pub(crate) const SETUP_NODE_SHA: &str = "60edb5dd545a775178f52524783378180af0d1f8";

    /// An in-memory [`TagSource`] counting its lookups.
    #[derive(Debug, Default)]
    pub(crate) struct FakeTags {
        tags: HashMap<String, Vec<Tag>>,
        pub(crate) lookups: AtomicUsize,
    }

    impl FakeTags {
        pub(crate) fn with(mut self, repository: &str, name: &str, sha: &str) -> Self {
            self.tags
                .entry(repository.to_owned())
                .or_default()
                .push(Tag::new(name, sha));
            self
        }

        pub(crate) fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        pub(crate) fn github() -> Self {
            Self::default()
                .with("actions/checkout", "v3", "f43a0e5ff2bd294095638e18286ca9a3d1956744")
                .with("actions/checkout", "v4", CHECKOUT_SHA)
                .with("actions/setup-node", "v4", SETUP_NODE_SHA)
        }
    }

    #[async_trait]
    impl TagSource for FakeTags {
        async fn list_tags(&self, owner: &str, repo: &str) -> Result<Vec<Tag>, LookupError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.tags
                .get(&format!("{owner}/{repo}"))
                .cloned()
                .ok_or_else(|| LookupError::RepositoryNotFound {
                    owner: owner.to_owned(),
                    repo: repo.to_owned(),
                })
        }
    }

    #[tokio::test]
    async fn pins_tags_to_commits() {
        let tags = FakeTags::github();
        let mut pins = ActionPinMapping::new();

        Resolver::new(&tags, ResolveMode::Online)
            .resolve(["actions/checkout@v4", "actions/setup-node@v4"], &mut pins)
            .await
            .expect("references resolve");

        assert_eq!(
            pins.get("actions/checkout@v4"),
            Some(format!("actions/checkout@{CHECKOUT_SHA}").as_str())
        );
        assert_eq!(
            pins.get("actions/setup-node@v4"),
            Some(format!("actions/setup-node@{SETUP_NODE_SHA}").as_str())
        );
    }

    #[tokio::test]
    async fn pinned_references_are_never_looked_up_again() {
        let tags = FakeTags::github();
        let resolver = Resolver::new(&tags, ResolveMode::Online);
        let mut pins = ActionPinMapping::new();

        resolver
            .resolve(["actions/checkout@v4"], &mut pins)
            .await
            .expect("first pass resolves");
        let first = pins.clone();
        resolver
            .resolve(["actions/checkout@v4"], &mut pins)
            .await
            .expect("second pass resolves");

        assert_eq!(tags.lookups(), 1);
        assert_eq!(pins, first);
    }

    #[tokio::test]
    async fn cached_entries_win_over_the_remote() {
        let tags = FakeTags::github();
        let mut pins: ActionPinMapping =
            [("actions/checkout@v4", "actions/checkout@youhavebeenhacked")]
                .into_iter()
                .collect();

        Resolver::new(&tags, ResolveMode::Online)
            .resolve(["actions/checkout@v4"], &mut pins)
            .await
            .expect("cached reference resolves");

        assert_eq!(tags.lookups(), 0);
        assert_eq!(pins.get("actions/checkout@v4"), Some("actions/checkout@youhavebeenhacked"));
    }

    #[tokio::test]
    async fn commit_shas_pass_through_without_lookups() {
        let tags = FakeTags::default();
        let reference = format!("actions/checkout@{CHECKOUT_SHA}");
        let mut pins = ActionPinMapping::new();

        Resolver::new(&tags, ResolveMode::Locked)
            .resolve([reference.as_str()], &mut pins)
            .await
            .expect("commit resolves");

        assert_eq!(tags.lookups(), 0);
        assert_eq!(pins.get(&reference), Some(reference.as_str()));
    }

    #[tokio::test]
    async fn commit_shas_override_conflicting_entries() {
        let tags = FakeTags::default();
        let reference = format!("actions/checkout@{CHECKOUT_SHA}");
        let mut pins: ActionPinMapping = [(
            reference.as_str(),
            "evil/checkout@0000000000000000000000000000000000000bad",
        )]
        .into_iter()
        .collect();

        Resolver::new(&tags, ResolveMode::Locked)
            .resolve([reference.as_str()], &mut pins)
            .await
            .expect("commit resolves");

        assert_eq!(tags.lookups(), 0);
        assert_eq!(pins.get(&reference), Some(reference.as_str()));
    }

    #[tokio::test]
    async fn non_remote_references_pass_through() {
        let tags = FakeTags::default();
        let mut pins = ActionPinMapping::new();

        Resolver::new(&tags, ResolveMode::Locked)
            .resolve(
                ["./.github/actions/setup", "docker://alpine:3.19", "custom-action"],
                &mut pins,
            )
            .await
            .expect("nothing to resolve");

        assert_eq!(tags.lookups(), 0);
        assert!(pins.is_empty());
    }

    #[tokio::test]
    async fn one_listing_per_repository() {
        let tags = FakeTags::github();
        let mut pins = ActionPinMapping::new();

        Resolver::new(&tags, ResolveMode::Online)
            .resolve(
                ["actions/checkout@v3", "actions/checkout@v4", "actions/checkout@v4"],
                &mut pins,
            )
            .await
            .expect("references resolve");

        assert_eq!(tags.lookups(), 1);
        assert_eq!(pins.len(), 2);
    }

    #[tokio::test]
    async fn missing_tags_fail_instead_of_passing_through() {
        let tags = FakeTags::github();
        let mut pins = ActionPinMapping::new();

        let err = Resolver::new(&tags, ResolveMode::Online)
            .resolve(["actions/checkout@v99"], &mut pins)
            .await
            .expect_err("unknown tag fails");

        assert!(matches!(
            &err,
            ResolveError::UnresolvableReference {
                repository,
                version,
                reason: Unresolvable::TagNotFound,
                ..
            } if repository == "actions/checkout" && version == "v99"
        ));
        assert!(pins.is_empty());
    }

    #[tokio::test]
    async fn locked_mode_never_looks_up() {
        let tags = FakeTags::github();
        let mut pins = ActionPinMapping::new();

        let err = Resolver::new(&tags, ResolveMode::Locked)
            .resolve(["actions/checkout@v4"], &mut pins)
            .await
            .expect_err("unpinned reference fails");

        assert_eq!(tags.lookups(), 0);
        assert!(matches!(err, ResolveError::MissingLockEntry { .. }));
    }

    #[tokio::test]
    async fn every_failure_is_reported() {
        let tags = FakeTags::github();
        let mut pins = ActionPinMapping::new();

        let err = Resolver::new(&tags, ResolveMode::Online)
            .resolve(
                ["actions/checkout@v4", "actions/checkout@v99", "nobody/nothing@v1"],
                &mut pins,
            )
            .await
            .expect_err("two references fail");

        assert_eq!(err.references(), ["actions/checkout@v99", "nobody/nothing@v1"]);
        assert!(err.to_string().starts_with("2 action references cannot be pinned:"));
        assert!(pins.contains("actions/checkout@v4"));
    }
}
