//! Data models of GitHub Actions workflows and the builder assembling them.
//!
//! A [`Workflow`] is built once by chaining its mutators, then handed to the
//! [`compiler`](crate::compiler). The fallible mutators return a [`Result`] so a chain reads
//! `Workflow::new("Build").on(Event::Push(None))?.add_job("build", job)?`.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

mod error;
pub mod event;
pub mod job;
pub mod step;

pub use error::WorkflowError;
pub use event::Event;
pub use job::{
    Concurrency, ConcurrencyGroup, Job, Matrix, MatrixAxes, Permissions, Runner, Secrets, Service,
    StepsJob, UsesJob,
};
pub use step::{Step, StepKind};

/// A scalar value: the inputs of actions and the values of matrices.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A string.
    String(String),
    /// An integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Boolean(bool),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Options applied to every `run` step of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// The working directory of `run` steps.
    pub working_directory: String,
}

impl Defaults {
    /// Runs every `run` step in the given directory.
    pub fn working_directory(directory: impl Into<String>) -> Self {
        Self {
            working_directory: directory.into(),
        }
    }
}

/// A workflow: its triggers, its jobs, and the configuration they share.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    name: String,
    events: Vec<Event>,
    jobs: IndexMap<String, Job>,
    concurrency: Concurrency,
    env: Vec<(String, String)>,
    defaults: Option<Defaults>,
    default_runner: Runner,
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            jobs: IndexMap::new(),
            concurrency: Concurrency::Unset,
            env: Vec::new(),
            defaults: None,
            default_runner: Runner::default(),
        }
    }

    /// Adds a trigger. Triggering twice on the same event records both.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::MalformedEvent`] if the options of the event are malformed.
    pub fn on(mut self, event: Event) -> Result<Self, WorkflowError> {
        event
            .validate()
            .map_err(|reason| WorkflowError::MalformedEvent {
                event: event.name(),
                reason,
            })?;
        self.events.push(event);
        Ok(self)
    }

    /// Adds a job.
    ///
    /// Dependencies must name jobs added before this one, which also rules out cycles.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] naming the job if the name is empty, contains whitespace or is already taken,
    /// if a dependency is not declared yet, or if the job has no steps or a reserved matrix axis.
    pub fn add_job(
        mut self,
        name: impl Into<String>,
        job: impl Into<Job>,
    ) -> Result<Self, WorkflowError> {
        let name = name.into();
        let job = job.into();

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(WorkflowError::InvalidJobName { job: name });
        }
        if self.jobs.contains_key(&name) {
            return Err(WorkflowError::DuplicateJob { job: name });
        }
        if let Some(dependency) = job
            .depends_on()
            .iter()
            .find(|dependency| !self.jobs.contains_key(dependency.as_str()))
        {
            return Err(WorkflowError::UnknownDependency {
                dependency: dependency.clone(),
                job: name,
            });
        }
        if let Job::Steps(steps_job) = &job {
            if steps_job.steps.is_empty() {
                return Err(WorkflowError::EmptySteps { job: name });
            }
            if let Some(Matrix::Axes(matrix)) = &steps_job.matrix {
                if let Some(axis) = matrix
                    .axes
                    .keys()
                    .find(|axis| MatrixAxes::RESERVED.contains(&axis.as_str()))
                {
                    return Err(WorkflowError::ReservedMatrixAxis {
                        axis: axis.clone(),
                        job: name,
                    });
                }
            }
        }

        debug!("added job {name} to workflow {}", self.name);
        self.jobs.insert(name, job);
        Ok(self)
    }

    /// Sets an environment variable shared by every job. The last value of a repeated name wins.
    pub fn set_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    /// Sets the defaults of every `run` step.
    pub fn add_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Sets the concurrency group of the whole workflow, or clears it with [`None`].
    pub fn set_concurrency_group(mut self, group: Option<ConcurrencyGroup>) -> Self {
        self.concurrency = group.into();
        self
    }

    /// Replaces the runner of jobs that do not choose one.
    pub fn set_default_runner(mut self, runner: impl Into<Runner>) -> Self {
        self.default_runner = runner.into();
        self
    }

    /// The name of the workflow.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The triggers, in the order they were added.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The jobs by name, in the order they were added.
    pub fn jobs(&self) -> &IndexMap<String, Job> {
        &self.jobs
    }

    /// The concurrency control of the whole workflow.
    pub fn concurrency(&self) -> &Concurrency {
        &self.concurrency
    }

    /// The environment variable assignments, in the order they were made.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// The defaults of every `run` step.
    pub fn defaults(&self) -> Option<&Defaults> {
        self.defaults.as_ref()
    }

    /// The runner of jobs that do not choose one.
    pub fn default_runner(&self) -> &Runner {
        &self.default_runner
    }

    /// The distinct action references of every step of every job, sorted.
    pub fn action_references(&self) -> BTreeSet<&str> {
        self.jobs
            .values()
            .flat_map(Job::steps)
            .filter_map(Step::action_reference)
            .collect()
    }
}
