use hex::FromHex as _;

/// A symbolic action reference split into its repository and version, such as `actions/checkout` and `v4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionReference<'a> {
    /// The whole reference, as written by the author.
    pub reference: &'a str,
    /// Everything before the last `@`, such as `actions/checkout` or `github/codeql-action/init`.
    pub repository: &'a str,
    /// Everything after the last `@`: a tag, a branch, or a commit.
    pub version: &'a str,
    owner: &'a str,
    repo: &'a str,
}

impl<'a> ActionReference<'a> {
    /// Parses a reference of a remote action.
    ///
    /// Returns [`None`] for anything else, such as local actions (`./action`), Docker images (`docker://alpine`),
    /// or references missing an `owner/repo` prefix or a version.
    pub fn parse(reference: &'a str) -> Option<Self> {
        let (repository, version) = reference.rsplit_once('@')?;
        let mut segments = repository.split('/');
        let owner = segments.next().filter(|owner| !owner.is_empty())?;
        let repo = segments.next().filter(|repo| !repo.is_empty())?;

        if version.is_empty() || owner == "." || owner == ".." || owner.contains(':') {
            return None;
        }

        Some(Self {
            reference,
            repository,
            version,
            owner,
            repo,
        })
    }

    /// The owner of the repository hosting the action.
    pub fn owner(&self) -> &'a str {
        self.owner
    }

    /// The name of the repository hosting the action, without any sub-path.
    pub fn repo(&self) -> &'a str {
        self.repo
    }

    /// Whether the version already is a full commit SHA.
    pub fn is_pinned(&self) -> bool {
        is_commit_sha(self.version)
    }

    /// The reference pinned to the given commit, keeping any sub-path of the action.
    pub fn pin(&self, sha: &str) -> String {
        format!("{}@{sha}", self.repository)
    }
}

/// Whether the version is a full, lowercase, 40 characters long commit SHA.
pub fn is_commit_sha(version: &str) -> bool {
    !version.bytes().any(|b| b.is_ascii_uppercase()) && <[u8; 20]>::from_hex(version).is_ok()
}
