//! Compiles a [`Workflow`] into its canonical [`Document`], which [`render`] turns into the YAML GitHub reads.
//!
//! Compiling is pure: it never fails, never touches the network, and the same workflow and pins always give the
//! same document.

use std::borrow::Cow;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    resolver::ActionPinMapping,
    workflow::{Job, Matrix, MatrixAxes, Step, StepKind, StepsJob, UsesJob, Workflow},
};

pub mod document;
mod render;

pub use document::{
    ConcurrencyDocument, DefaultsDocument, Document, JobDocument, MatrixDocument, StepDocument,
    StepsJobDocument, StrategyDocument, UsesJobDocument,
};
pub use render::{BANNER, CompileError, render};

/// The timeout of jobs that do not set one.
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 15;

/// Compiles a workflow, replacing every action reference found in `pins` by its pinned form.
///
/// References missing from `pins` are kept as written, so pins must come from a successful resolution pass.
pub fn compile<'a>(workflow: &'a Workflow, pins: &'a ActionPinMapping) -> Document<'a> {
    let mut on = IndexMap::new();
    for event in workflow.events() {
        on.insert(event.name(), event.options());
    }

    let mut env = IndexMap::new();
    for (name, value) in workflow.env() {
        env.insert(name.as_str(), value.as_str());
    }

    let jobs = workflow
        .jobs()
        .iter()
        .map(|(name, job)| (name.as_str(), compile_job(workflow, name, job, pins)))
        .collect();

    debug!("compiled workflow {}", workflow.name());
    Document {
        name: workflow.name(),
        on,
        concurrency: workflow.concurrency().group().map(|group| ConcurrencyDocument {
            group: Cow::Borrowed(group.group_suffix.as_str()),
            cancel_in_progress: group.cancel_previous,
        }),
        defaults: workflow
            .defaults()
            .map(|defaults| DefaultsDocument::working_directory(&defaults.working_directory)),
        env: (!env.is_empty()).then_some(env),
        jobs,
    }
}

/// Converts text to lowercase words joined by `-`.
///
/// Words break at anything but letters and digits, between a lowercase and an uppercase letter, before the last
/// capital of an acronym followed by lowercase (`HTTPServer` gives `http-server`), and between letters and digits.
pub fn kebab_case(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut word = String::new();
    let mut previous: Option<char> = None;

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            previous = None;
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        }

        if let Some(previous) = previous {
            let next = chars.get(i + 1).copied();
            let acronym_end = previous.is_uppercase()
                && c.is_uppercase()
                && next.is_some_and(char::is_lowercase);
            let boundary = (previous.is_lowercase() && c.is_uppercase())
                || acronym_end
                || (previous.is_numeric() != c.is_numeric());
            if boundary {
                words.push(std::mem::take(&mut word));
            }
        }

        word.extend(c.to_lowercase());
        previous = Some(c);
    }

    if !word.is_empty() {
        words.push(word);
    }
    words.join("-")
}

fn compile_job<'a>(
    workflow: &'a Workflow,
    name: &str,
    job: &'a Job,
    pins: &'a ActionPinMapping,
) -> JobDocument<'a> {
    match job {
        Job::Steps(job) => JobDocument::Steps(compile_steps_job(workflow, name, job, pins)),
        Job::Uses(job) => JobDocument::Uses(compile_uses_job(job)),
    }
}

fn compile_steps_job<'a>(
    workflow: &'a Workflow,
    name: &str,
    job: &'a StepsJob,
    pins: &'a ActionPinMapping,
) -> StepsJobDocument<'a> {
    StepsJobDocument {
        name: job.pretty_name.as_deref(),
        permissions: job.permissions.as_ref(),
        if_expression: job.if_expression.as_deref(),
        runs_on: job.runs_on.as_ref().unwrap_or(workflow.default_runner()),
        timeout_minutes: job.timeout.unwrap_or(DEFAULT_TIMEOUT_MINUTES),
        needs: non_empty(job.depends_on.as_slice()),
        services: non_empty_map(&job.services),
        concurrency: job.concurrency.group().map(|group| ConcurrencyDocument {
            group: Cow::Owned(format!(
                "{}-{name}-{}",
                kebab_case(workflow.name()),
                group.group_suffix
            )),
            cancel_in_progress: group.cancel_previous,
        }),
        strategy: job.matrix.as_ref().map(compile_matrix),
        env: non_empty_map(&job.env),
        environment: job.environment.as_deref(),
        defaults: job
            .working_directory
            .as_deref()
            .map(DefaultsDocument::working_directory),
        steps: job.steps.iter().map(|step| compile_step(step, pins)).collect(),
        outputs: non_empty_map(&job.outputs),
    }
}

fn compile_uses_job(job: &UsesJob) -> UsesJobDocument<'_> {
    UsesJobDocument {
        name: job.pretty_name.as_deref(),
        if_expression: job.if_expression.as_deref(),
        needs: non_empty(job.depends_on.as_slice()),
        uses: &job.uses,
        with: non_empty_map(&job.with),
        secrets: job.secrets.as_ref(),
        environment: job.environment.as_deref(),
    }
}

fn compile_matrix(matrix: &Matrix) -> StrategyDocument<'_> {
    let matrix = match matrix {
        Matrix::Expression(expression) => MatrixDocument::Expression(expression),
        Matrix::Axes(MatrixAxes {
            axes,
            include,
            exclude,
        }) => MatrixDocument::Axes {
            axes,
            include: non_empty(include.as_slice()),
            exclude: non_empty(exclude.as_slice()),
        },
    };

    StrategyDocument {
        fail_fast: false,
        matrix,
    }
}

fn compile_step<'a>(step: &'a Step, pins: &'a ActionPinMapping) -> StepDocument<'a> {
    let (run, uses, with) = match &step.kind {
        StepKind::Run(command) => (Some(command.as_str()), None, None),
        StepKind::Uses { uses, with } => (
            None,
            Some(pins.get(uses).unwrap_or(uses.as_str())),
            non_empty_map(with),
        ),
    };

    StepDocument {
        id: step.id.as_deref(),
        name: step.name.as_deref(),
        if_expression: step.if_expression.as_deref(),
        continue_on_error: step.continue_on_error,
        working_directory: step.working_directory.as_deref(),
        timeout_minutes: step.timeout,
        env: non_empty_map(&step.env),
        run,
        uses,
        with,
    }
}

fn non_empty<T>(items: &[T]) -> Option<&[T]> {
    (!items.is_empty()).then_some(items)
}

fn non_empty_map<K, V>(map: &IndexMap<K, V>) -> Option<&IndexMap<K, V>> {
    (!map.is_empty()).then_some(map)
}
