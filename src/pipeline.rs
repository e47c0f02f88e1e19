//! Entry points chaining the lock file, the [`Resolver`], the [`compiler`](crate::compiler) and the output files.

use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::info;

use crate::{
    Error,
    compiler::{compile, render},
    resolver::{ActionPinMapping, ResolveMode, Resolver, TagSource, lock::write_atomically},
    workflow::Workflow,
};

/// Options of [`compile_workflow`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Where to write the workflow. The text is returned when unset.
    pub output_path: Option<PathBuf>,
    /// The lock file to pin references from.
    pub lock_file_path: Option<PathBuf>,
    /// Whether unpinned references may be looked up, and the lock file rewritten with them.
    ///
    /// When unset, every reference must already be pinned in the lock file.
    pub allow_network_write: bool,
}

impl CompileOptions {
    /// Options returning the text, with nothing pinned in advance and lookups disallowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the workflow to the given path.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Pins references from the given lock file.
    pub fn lock_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file_path = Some(path.into());
        self
    }

    /// Allows looking up unpinned references and rewriting the lock file.
    pub fn allow_network_write(mut self, allow: bool) -> Self {
        self.allow_network_write = allow;
        self
    }
}

/// The result of [`compile_workflow`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// The rendered workflow, when no output path was given.
    Text(String),
    /// The path the rendered workflow was written to.
    Written(PathBuf),
}

/// Options of [`compile_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// The directory workflows are written to, usually `.github/workflows`.
    pub workflows_dir: PathBuf,
    /// The lock file shared by every workflow of the batch.
    pub lock_file_path: Option<PathBuf>,
    /// Whether unpinned references may be looked up, and the lock file rewritten with them.
    pub allow_network_write: bool,
}

impl BatchOptions {
    /// Writes workflows to the given directory.
    pub fn new(workflows_dir: impl Into<PathBuf>) -> Self {
        Self {
            workflows_dir: workflows_dir.into(),
            lock_file_path: None,
            allow_network_write: false,
        }
    }

    /// Pins references from the given lock file.
    pub fn lock_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file_path = Some(path.into());
        self
    }

    /// Allows looking up unpinned references and rewriting the lock file.
    pub fn allow_network_write(mut self, allow: bool) -> Self {
        self.allow_network_write = allow;
        self
    }
}

/// Pins the given references, starting from the lock file if there is one.
///
/// With `allow_network_write`, missing references are looked up through `source` and the lock file is rewritten
/// once every reference is pinned. Otherwise `source` is never called and the lock file is left alone.
///
/// # Errors
///
/// Returns an error if the lock file cannot be read or written, or if any reference cannot be pinned. The lock file
/// is untouched in both cases.
pub async fn resolve_pins<'r, I, S>(
    references: I,
    lock_file_path: Option<&Path>,
    allow_network_write: bool,
    source: &S,
) -> Result<ActionPinMapping, Error>
where
    I: IntoIterator<Item = &'r str>,
    S: TagSource + ?Sized,
{
    let mut pins = match lock_file_path {
        Some(path) => ActionPinMapping::load(path).await?,
        None => ActionPinMapping::new(),
    };

    let mode = if allow_network_write {
        ResolveMode::Online
    } else {
        ResolveMode::Locked
    };
    Resolver::new(source, mode).resolve(references, &mut pins).await?;

    if let (ResolveMode::Online, Some(path)) = (mode, lock_file_path) {
        pins.save(path).await?;
    }
    Ok(pins)
}

/// Pins, compiles and renders a single workflow, then writes it if an output path is given.
///
/// # Errors
///
/// Returns an error if pinning fails, if the workflow cannot be rendered, or if it cannot be written. Nothing is
/// written unless every reference is pinned.
pub async fn compile_workflow<S>(
    workflow: &Workflow,
    options: &CompileOptions,
    source: &S,
) -> Result<Output, Error>
where
    S: TagSource + ?Sized,
{
    let pins = resolve_pins(
        workflow.action_references(),
        options.lock_file_path.as_deref(),
        options.allow_network_write,
        source,
    )
    .await?;
    let text = render(&compile(workflow, &pins))?;

    match &options.output_path {
        Some(path) => {
            write_output(path, &text).await?;
            Ok(Output::Written(path.clone()))
        }
        None => Ok(Output::Text(text)),
    }
}

/// Compiles workflows sharing a lock file, writing each to `<workflows_dir>/<file>`.
///
/// The references of every workflow are pinned in a single pass, so the lock file is read and written once. Every
/// workflow is rendered before the first one is written.
///
/// # Errors
///
/// Returns an error if two workflows target the same file, if pinning fails, or if any workflow cannot be rendered
/// or written.
pub async fn compile_batch<S>(
    workflows: &[(PathBuf, Workflow)],
    options: &BatchOptions,
    source: &S,
) -> Result<Vec<PathBuf>, Error>
where
    S: TagSource + ?Sized,
{
    let paths: Vec<PathBuf> = workflows
        .iter()
        .map(|(file, _)| options.workflows_dir.join(file))
        .collect();
    let mut seen = HashSet::new();
    if let Some(path) = paths.iter().find(|path| !seen.insert(*path)) {
        return Err(Error::DuplicateOutput { path: path.clone() });
    }

    let references: BTreeSet<&str> = workflows
        .iter()
        .flat_map(|(_, workflow)| workflow.action_references())
        .collect();
    let pins = resolve_pins(
        references,
        options.lock_file_path.as_deref(),
        options.allow_network_write,
        source,
    )
    .await?;

    let texts = workflows
        .iter()
        .map(|(_, workflow)| render(&compile(workflow, &pins)))
        .collect::<Result<Vec<_>, _>>()?;

    for (path, text) in paths.iter().zip(&texts) {
        write_output(path, text).await?;
    }

    info!(
        "compiled {} workflows into {}",
        paths.len(),
        options.workflows_dir.display()
    );
    Ok(paths)
}

async fn write_output(path: &Path, text: &str) -> Result<(), Error> {
    let output_error = |source| Error::Output {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(output_error)?;
    }
    write_atomically(path, text.as_bytes())
        .await
        .map_err(output_error)?;

    info!("wrote workflow to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as StdError;

    use tempfile::TempDir;

    use crate::{
        resolver::{
            ResolveError,
            tests::{CHECKOUT_SHA, FakeTags, SETUP_NODE_SHA},
        },
        workflow::{Event, Step, StepsJob, WorkflowError},
    };

    fn checkout(name: &str, references: &[&str]) -> Result<Workflow, WorkflowError> {
        Workflow::new(name)
            .on(Event::Push(None))?
            .add_job("build", StepsJob::new(references.iter().copied().map(Step::uses)))
    }

    #[tokio::test]
    async fn text_is_returned_without_an_output_path() -> Result<(), Box<dyn StdError>> {
        let tags = FakeTags::github();
        let workflow = checkout("Build", &["actions/checkout@v4"])?;

        let options = CompileOptions::new().allow_network_write(true);
        let output = compile_workflow(&workflow, &options, &tags).await?;

        let Output::Text(text) = output else {
            panic!("expected the rendered text");
        };
        assert!(text.contains(&format!("uses: actions/checkout@{CHECKOUT_SHA}")));
        Ok(())
    }

    #[tokio::test]
    async fn locked_mode_without_a_lock_file_pins_nothing() -> Result<(), Box<dyn StdError>> {
        let tags = FakeTags::github();
        let workflow = checkout("Build", &["actions/checkout@v4"])?;

        let result = compile_workflow(&workflow, &CompileOptions::new(), &tags).await;

        assert!(matches!(
            result,
            Err(Error::Resolve(ResolveError::MissingLockEntry { .. }))
        ));
        assert_eq!(tags.lookups(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn locked_passes_reuse_the_lock_file_of_online_passes() -> Result<(), Box<dyn StdError>> {
        let dir = TempDir::new()?;
        let lock = dir.path().join("gat.lock.json");
        let workflow = checkout("Build", &["actions/checkout@v4", "actions/setup-node@v4"])?;

        let online = FakeTags::github();
        let options = CompileOptions::new().lock_file_path(&lock).allow_network_write(true);
        let first = compile_workflow(&workflow, &options, &online).await?;
        assert_eq!(online.lookups(), 2);

        let saved = ActionPinMapping::load(&lock).await?;
        assert_eq!(
            saved.get("actions/setup-node@v4"),
            Some(format!("actions/setup-node@{SETUP_NODE_SHA}").as_str())
        );

        let offline = FakeTags::default();
        let contents = std::fs::read_to_string(&lock)?;
        let locked = CompileOptions::new().lock_file_path(&lock);
        let second = compile_workflow(&workflow, &locked, &offline).await?;
        assert_eq!(offline.lookups(), 0);
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&lock)?, contents);
        Ok(())
    }

    #[tokio::test]
    async fn failed_passes_write_nothing() -> Result<(), Box<dyn StdError>> {
        let dir = TempDir::new()?;
        let lock = dir.path().join("gat.lock.json");
        let output = dir.path().join("build.yml");
        let workflow = checkout("Build", &["actions/checkout@v4", "actions/checkout@v99"])?;

        let options = CompileOptions::new()
            .output_path(&output)
            .lock_file_path(&lock)
            .allow_network_write(true);
        let result = compile_workflow(&workflow, &options, &FakeTags::github()).await;

        assert!(matches!(
            result,
            Err(Error::Resolve(ResolveError::UnresolvableReference { .. }))
        ));
        assert!(!lock.exists());
        assert!(!output.exists());
        Ok(())
    }

    #[tokio::test]
    async fn batches_resolve_once() -> Result<(), Box<dyn StdError>> {
        let dir = TempDir::new()?;
        let workflows_dir = dir.path().join(".github").join("workflows");
        let lock = dir.path().join("gat.lock.json");
        let workflows = [
            (PathBuf::from("build.yml"), checkout("Build", &["actions/checkout@v4"])?),
            (
                PathBuf::from("test.yml"),
                checkout("Test", &["actions/checkout@v4", "actions/setup-node@v4"])?,
            ),
        ];

        let tags = FakeTags::github();
        let options = BatchOptions::new(&workflows_dir)
            .lock_file_path(&lock)
            .allow_network_write(true);
        let written = compile_batch(&workflows, &options, &tags).await?;

        assert_eq!(written, [workflows_dir.join("build.yml"), workflows_dir.join("test.yml")]);
        assert_eq!(tags.lookups(), 2);
        assert_eq!(ActionPinMapping::load(&lock).await?.len(), 2);

        let test = std::fs::read_to_string(workflows_dir.join("test.yml"))?;
        assert!(test.contains(&format!("actions/setup-node@{SETUP_NODE_SHA}")));
        Ok(())
    }

    #[tokio::test]
    async fn batches_reject_shared_outputs() -> Result<(), Box<dyn StdError>> {
        let dir = TempDir::new()?;
        let workflows = [
            (PathBuf::from("ci.yml"), checkout("Build", &["actions/checkout@v4"])?),
            (PathBuf::from("ci.yml"), checkout("Test", &["actions/checkout@v4"])?),
        ];

        let tags = FakeTags::github();
        let options = BatchOptions::new(dir.path()).allow_network_write(true);
        let result = compile_batch(&workflows, &options, &tags).await;

        assert!(matches!(result, Err(Error::DuplicateOutput { .. })));
        assert_eq!(tags.lookups(), 0);
        Ok(())
    }
}
