use thiserror::Error;

/// Errors raised while assembling a [`Workflow`](super::Workflow), before any compilation work begins.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// A job name is empty or contains whitespace.
    #[error("invalid job name `{job}`: job names must be non-empty and contain no whitespace")]
    InvalidJobName { job: String },

    /// Two jobs share a name.
    #[error("duplicate job name `{job}`")]
    DuplicateJob { job: String },

    /// A job depends on a job that is not declared before it.
    #[error("job `{job}` depends on `{dependency}`, which is not declared before it")]
    UnknownDependency { job: String, dependency: String },

    /// A job that runs steps has none.
    #[error("job `{job}` has no steps")]
    EmptySteps { job: String },

    /// A matrix axis collides with a key of the matrix itself.
    #[error("job `{job}` has a matrix axis named `{axis}`, which is reserved")]
    ReservedMatrixAxis { job: String, axis: String },

    /// The options of an event are malformed.
    #[error("malformed `{event}` event: {reason}")]
    MalformedEvent { event: &'static str, reason: String },
}
