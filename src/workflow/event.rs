//! Events that trigger a workflow, each carrying the filters its kind accepts.

use indexmap::IndexMap;
use serde::Serialize;

use super::Scalar;

/// An event that triggers a workflow.
///
/// Each variant carries the options of its own kind, so the options always match the event. [`None`] means that no
/// options were supplied, which compiles to an explicit empty trigger.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `push`
    Push(Option<PushOptions>),
    /// `pull_request`
    PullRequest(Option<PullRequestOptions>),
    /// `pull_request_target`
    PullRequestTarget(Option<PullRequestOptions>),
    /// `pull_request_review`
    PullRequestReview(Option<PullRequestReviewOptions>),
    /// `workflow_run`
    WorkflowRun(Option<WorkflowRunOptions>),
    /// `workflow_dispatch`
    WorkflowDispatch(Option<WorkflowDispatchOptions>),
    /// `workflow_call`
    WorkflowCall(Option<WorkflowCallOptions>),
    /// `schedule`, an ordered and non-empty list of cron expressions.
    Schedule(Vec<Schedule>),
    /// `repository_dispatch`
    RepositoryDispatch(Option<RepositoryDispatchOptions>),
    /// `merge_group`
    MergeGroup(Option<MergeGroupOptions>),
}

impl Event {
    /// The name of the event in the workflow document.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::PullRequest(_) => "pull_request",
            Self::PullRequestTarget(_) => "pull_request_target",
            Self::PullRequestReview(_) => "pull_request_review",
            Self::WorkflowRun(_) => "workflow_run",
            Self::WorkflowDispatch(_) => "workflow_dispatch",
            Self::WorkflowCall(_) => "workflow_call",
            Self::Schedule(_) => "schedule",
            Self::RepositoryDispatch(_) => "repository_dispatch",
            Self::MergeGroup(_) => "merge_group",
        }
    }

    /// Borrows the options of the event, if any were supplied.
    pub fn options(&self) -> Option<EventOptions<'_>> {
        match self {
            Self::Push(options) => options.as_ref().map(EventOptions::Push),
            Self::PullRequest(options) | Self::PullRequestTarget(options) => {
                options.as_ref().map(EventOptions::PullRequest)
            }
            Self::PullRequestReview(options) => {
                options.as_ref().map(EventOptions::PullRequestReview)
            }
            Self::WorkflowRun(options) => options.as_ref().map(EventOptions::WorkflowRun),
            Self::WorkflowDispatch(options) => options.as_ref().map(EventOptions::WorkflowDispatch),
            Self::WorkflowCall(options) => options.as_ref().map(EventOptions::WorkflowCall),
            Self::Schedule(schedules) => Some(EventOptions::Schedule(schedules)),
            Self::RepositoryDispatch(options) => {
                options.as_ref().map(EventOptions::RepositoryDispatch)
            }
            Self::MergeGroup(options) => options.as_ref().map(EventOptions::MergeGroup),
        }
    }

    /// Checks the values of the options that their types cannot rule out.
    ///
    /// # Errors
    ///
    /// Returns the reason why the options are malformed.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Schedule(schedules) => {
                if schedules.is_empty() {
                    return Err(String::from("at least one cron expression is required"));
                }
                schedules.iter().try_for_each(Schedule::validate)
            }
            Self::WorkflowDispatch(Some(options)) => options
                .inputs
                .iter()
                .try_for_each(|(name, input)| input.validate(name)),
            Self::WorkflowCall(Some(options)) => {
                let names = options.inputs.keys().chain(options.secrets.keys());
                names.map(String::as_str).try_for_each(validate_input_name)
            }
            _ => Ok(()),
        }
    }
}

/// Borrowed options of an [`Event`], serialized as the body of the trigger.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum EventOptions<'a> {
    /// Options of `push`.
    Push(&'a PushOptions),
    /// Options of `pull_request` and `pull_request_target`.
    PullRequest(&'a PullRequestOptions),
    /// Options of `pull_request_review`.
    PullRequestReview(&'a PullRequestReviewOptions),
    /// Options of `workflow_run`.
    WorkflowRun(&'a WorkflowRunOptions),
    /// Options of `workflow_dispatch`.
    WorkflowDispatch(&'a WorkflowDispatchOptions),
    /// Options of `workflow_call`.
    WorkflowCall(&'a WorkflowCallOptions),
    /// Options of `schedule`.
    Schedule(&'a [Schedule]),
    /// Options of `repository_dispatch`.
    RepositoryDispatch(&'a RepositoryDispatchOptions),
    /// Options of `merge_group`.
    MergeGroup(&'a MergeGroupOptions),
}

fn validate_input_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        Err(format!("input name `{name}` must be non-empty and contain no whitespace"))
    } else {
        Ok(())
    }
}

/// Filters of `push`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct PushOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches_ignore: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags_ignore: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths_ignore: Vec<String>,
}

impl PushOptions {
    /// Only triggers on pushes to the given branches.
    pub fn branches<I, S>(branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            branches: branches.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Activity types of `pull_request` and `pull_request_target`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PullRequestActivity {
    Assigned,
    Unassigned,
    Labeled,
    Unlabeled,
    Opened,
    Edited,
    Closed,
    Reopened,
    Synchronize,
    ConvertedToDraft,
    ReadyForReview,
    Locked,
    Unlocked,
    ReviewRequested,
    ReviewRequestRemoved,
    AutoMergeEnabled,
    AutoMergeDisabled,
}

/// Filters of `pull_request` and `pull_request_target`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct PullRequestOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches_ignore: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths_ignore: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<PullRequestActivity>,
}

impl PullRequestOptions {
    /// Only triggers on the given activity types.
    pub fn types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = PullRequestActivity>,
    {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// Activity types of `pull_request_review`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PullRequestReviewActivity {
    Submitted,
    Edited,
    Dismissed,
}

/// Filters of `pull_request_review`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct PullRequestReviewOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<PullRequestReviewActivity>,
}

/// Activity types of `workflow_run`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum WorkflowRunActivity {
    Completed,
    Requested,
    InProgress,
}

/// Filters of `workflow_run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct WorkflowRunOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<WorkflowRunActivity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches_ignore: Vec<String>,
}

/// The type of a `workflow_dispatch` input.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum DispatchInputType {
    String,
    Boolean,
    Choice,
    Number,
    Environment,
}

/// An input of `workflow_dispatch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct WorkflowDispatchInput {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<DispatchInputType>,
    /// The choices of a [`DispatchInputType::Choice`] input.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Scalar>,
}

impl WorkflowDispatchInput {
    /// Creates an input with a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Marks the input as required.
    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Turns the input into a choice between the given options.
    pub fn choice<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind = Some(DispatchInputType::Choice);
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: impl Into<Scalar>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        validate_input_name(name)?;
        match (self.kind, self.options.is_empty()) {
            (Some(DispatchInputType::Choice), true) => {
                return Err(format!("choice input `{name}` has no options"));
            }
            (Some(DispatchInputType::Choice), false) => {}
            (_, false) => return Err(format!("input `{name}` has options but is not a choice")),
            (_, true) => {}
        }
        match (&self.kind, &self.default) {
            (Some(DispatchInputType::Choice), Some(Scalar::String(default)))
                if !self.options.contains(default) =>
            {
                Err(format!("default `{default}` of input `{name}` is not one of its options"))
            }
            _ => Ok(()),
        }
    }
}

/// Options of `workflow_dispatch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct WorkflowDispatchOptions {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, WorkflowDispatchInput>,
}

impl WorkflowDispatchOptions {
    /// Adds an input, replacing any input with the same name.
    pub fn input(mut self, name: impl Into<String>, input: WorkflowDispatchInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }
}

/// The type of a `workflow_call` input.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum CallInputType {
    String,
    Boolean,
    Number,
}

/// An input of `workflow_call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct WorkflowCallInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "type")]
    pub kind: CallInputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Scalar>,
}

/// A secret of `workflow_call`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct WorkflowCallSecret {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Options of `workflow_call`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct WorkflowCallOptions {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, WorkflowCallInput>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub secrets: IndexMap<String, WorkflowCallSecret>,
}

/// A cron expression of `schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Schedule {
    pub cron: String,
}

impl Schedule {
    /// Creates a schedule from a five-field cron expression.
    pub fn cron(cron: impl Into<String>) -> Self {
        Self { cron: cron.into() }
    }

    fn validate(&self) -> Result<(), String> {
        match self.cron.split_whitespace().count() {
            5 => Ok(()),
            fields => Err(format!(
                "cron expression `{}` has {fields} fields, expected 5",
                self.cron
            )),
        }
    }
}

/// Filters of `repository_dispatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct RepositoryDispatchOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

/// Activity types of `merge_group`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum MergeGroupActivity {
    ChecksRequested,
}

/// Filters of `merge_group`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct MergeGroupOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<MergeGroupActivity>,
}
