//! The lock file: a persisted mapping from symbolic action references to pinned ones.

use std::{
    collections::{BTreeMap, btree_map},
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::{debug, info};

/// Errors of reading or writing the lock file.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file exists but cannot be read.
    #[error("failed to read lock file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The lock file is not a JSON object of strings.
    #[error("failed to parse lock file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The lock file cannot be replaced.
    #[error("failed to write lock file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A mapping from symbolic action references (`owner/repo@tag`) to pinned ones (`owner/repo@<commit sha>`).
///
/// Entries are kept sorted so that rewriting an unchanged mapping yields an identical lock file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionPinMapping(BTreeMap<String, String>);

impl ActionPinMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pinned reference of a symbolic reference.
    pub fn get(&self, reference: &str) -> Option<&str> {
        self.0.get(reference).map(String::as_str)
    }

    /// Whether the symbolic reference is pinned.
    pub fn contains(&self, reference: &str) -> bool {
        self.0.contains_key(reference)
    }

    /// Pins a symbolic reference, keeping the existing entry if there is one.
    ///
    /// Returns the pinned reference now in the mapping.
    pub fn insert(&mut self, reference: impl Into<String>, pinned: impl Into<String>) -> &str {
        self.0.entry(reference.into()).or_insert_with(|| pinned.into())
    }

    /// Pins a symbolic reference, replacing the existing entry if there is one.
    ///
    /// Returns the replaced entry.
    pub fn replace(
        &mut self,
        reference: impl Into<String>,
        pinned: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(reference.into(), pinned.into())
    }

    /// The number of pinned references.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries, sorted by symbolic reference.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Loads the mapping from a lock file. A missing lock file is an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns a [`LockError`] if the lock file exists but cannot be read or parsed.
    pub async fn load<P>(path: P) -> Result<Self, LockError>
    where
        P: AsRef<Path> + Send + Sync,
    {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no lock file at {}, starting from an empty one", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(LockError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        let mapping: Self = serde_json::from_str(&contents).map_err(|source| LockError::Parse {
            path: path.to_owned(),
            source,
        })?;
        debug!("loaded {} pinned actions from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    /// Replaces the lock file with this mapping, atomically.
    ///
    /// # Errors
    ///
    /// Returns a [`LockError`] if the lock file cannot be written.
    pub async fn save<P>(&self, path: P) -> Result<(), LockError>
    where
        P: AsRef<Path> + Send + Sync,
    {
        let path = path.as_ref();
        let write_error = |source| LockError::Write {
            path: path.to_owned(),
            source,
        };

        let mut contents =
            serde_json::to_string_pretty(self).map_err(|err| write_error(err.into()))?;
        contents.push('\n');
        write_atomically(path, contents.as_bytes())
            .await
            .map_err(write_error)?;

        info!("wrote {} pinned actions to {}", self.len(), path.display());
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ActionPinMapping {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for ActionPinMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Replaces a file with the given contents so that readers see either the old or the new file, never a torn one.
///
/// The contents go to a temporary sibling first, which is then renamed over the file.
pub(crate) async fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a file path", path.display()),
        )
    })?;
    let temporary = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    if let Err(err) = write_synced(&temporary, contents).await {
        drop(fs::remove_file(&temporary).await);
        return Err(err);
    }
    if let Err(err) = fs::rename(&temporary, path).await {
        drop(fs::remove_file(&temporary).await);
        return Err(err);
    }
    Ok(())
}

async fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}
