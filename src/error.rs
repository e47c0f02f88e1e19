use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{
    compiler::CompileError,
    resolver::{LockError, ResolveError},
    workflow::WorkflowError,
};

/// Errors of building, resolving, compiling and writing workflows.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// The workflow is malformed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Action references cannot be pinned.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The lock file cannot be read or written.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The workflow cannot be rendered.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The rendered workflow cannot be written.
    #[error("failed to write workflow {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two workflows of a batch would overwrite each other.
    #[error("more than one workflow would be written to {}", path.display())]
    DuplicateOutput { path: PathBuf },
}
