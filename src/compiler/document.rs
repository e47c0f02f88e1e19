//! The canonical workflow document, borrowing from the [`Workflow`](crate::workflow::Workflow) it was compiled from.
//!
//! Field order is the key order of the rendered YAML. Unset options and empty collections are [`None`] and left out.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;

use crate::workflow::{
    Permissions, Runner, Scalar, Secrets, Service,
    event::EventOptions,
    job::MatrixRecord,
};

/// A compiled workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Document<'a> {
    /// The workflow name.
    pub name: &'a str,
    /// Every trigger by name, with its options or an explicit null.
    pub on: IndexMap<&'static str, Option<EventOptions<'a>>>,
    /// The workflow-wide concurrency group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyDocument<'a>>,
    /// The default working directory of run steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsDocument<'a>>,
    /// Workflow-wide environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<IndexMap<&'a str, &'a str>>,
    /// Every job by id, in declaration order.
    pub jobs: IndexMap<&'a str, JobDocument<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct ConcurrencyDocument<'a> {
    pub group: Cow<'a, str>,
    pub cancel_in_progress: bool,
}

/// `defaults`, at the workflow or the job level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct DefaultsDocument<'a> {
    pub run: RunDefaults<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct RunDefaults<'a> {
    pub working_directory: &'a str,
}

impl<'a> DefaultsDocument<'a> {
    pub(super) fn working_directory(working_directory: &'a str) -> Self {
        Self {
            run: RunDefaults { working_directory },
        }
    }
}

/// A compiled job.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobDocument<'a> {
    /// A job running steps.
    Steps(StepsJobDocument<'a>),
    /// A job delegating to a reusable workflow.
    Uses(UsesJobDocument<'a>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct StepsJobDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<&'a Permissions>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_expression: Option<&'a str>,
    pub runs_on: &'a Runner,
    pub timeout_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<&'a IndexMap<String, Service>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyDocument<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyDocument<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<&'a IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsDocument<'a>>,
    pub steps: Vec<StepDocument<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<&'a IndexMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
#[allow(missing_docs)]
pub struct UsesJobDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_expression: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs: Option<&'a [String]>,
    pub uses: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with: Option<&'a IndexMap<String, Scalar>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<&'a Secrets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<&'a str>,
}

/// `strategy`. Runs of a matrix never cancel each other.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct StrategyDocument<'a> {
    pub fail_fast: bool,
    pub matrix: MatrixDocument<'a>,
}

/// `strategy.matrix`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MatrixDocument<'a> {
    /// A raw expression.
    Expression(&'a str),
    /// Every axis as a key of its own, then `include` and `exclude`.
    Axes {
        /// The values of every axis.
        #[serde(flatten)]
        axes: &'a IndexMap<String, Vec<Scalar>>,
        /// Extra combinations.
        #[serde(skip_serializing_if = "Option::is_none")]
        include: Option<&'a [MatrixRecord]>,
        /// Left out combinations.
        #[serde(skip_serializing_if = "Option::is_none")]
        exclude: Option<&'a [MatrixRecord]>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct StepDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_expression: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<&'a IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<&'a str>,
    /// The pinned reference when the resolver pinned it, the reference as written otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with: Option<&'a IndexMap<String, Scalar>>,
}
