use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap as _};

use super::{Scalar, Step};

/// The runner used when a job does not choose one.
pub const DEFAULT_RUNNER: &str = "ubuntu-22.04";

/// A named unit of work of a workflow.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Runs an ordered list of steps on a runner.
    Steps(StepsJob),
    /// Delegates to a reusable workflow.
    Uses(UsesJob),
}

impl Job {
    /// The names of the jobs this job waits for.
    pub fn depends_on(&self) -> &[String] {
        match self {
            Self::Steps(job) => &job.depends_on,
            Self::Uses(job) => &job.depends_on,
        }
    }

    /// The steps of the job, empty for a job delegating to a reusable workflow.
    pub fn steps(&self) -> &[Step] {
        match self {
            Self::Steps(job) => &job.steps,
            Self::Uses(_) => &[],
        }
    }
}

impl From<StepsJob> for Job {
    fn from(job: StepsJob) -> Self {
        Self::Steps(job)
    }
}

impl From<UsesJob> for Job {
    fn from(job: UsesJob) -> Self {
        Self::Uses(job)
    }
}

/// A job that runs steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepsJob {
    /// The display name, rendered as `name`.
    pub pretty_name: Option<String>,
    /// The permissions of the `GITHUB_TOKEN`.
    pub permissions: Option<Permissions>,
    /// The expression that guards the job, rendered as `if`.
    pub if_expression: Option<String>,
    /// The runner, falling back to the workflow's default runner.
    pub runs_on: Option<Runner>,
    /// The timeout in minutes, 15 if unset.
    pub timeout: Option<u32>,
    /// Jobs declared earlier in the same workflow that must finish first.
    pub depends_on: Vec<String>,
    /// Service containers by name.
    pub services: IndexMap<String, Service>,
    /// Environment variables of every step.
    pub env: IndexMap<String, String>,
    /// The concurrency group, namespaced by the workflow and job names when compiled.
    pub concurrency: Concurrency,
    /// The matrix, always compiled with `fail-fast: false`.
    pub matrix: Option<Matrix>,
    /// The steps, at least one.
    pub steps: Vec<Step>,
    /// Outputs by name, usually expressions over step outputs.
    pub outputs: IndexMap<String, String>,
    /// The default working directory of run steps.
    pub working_directory: Option<String>,
    /// The deployment environment.
    pub environment: Option<String>,
}

impl StepsJob {
    /// Creates a job running the given steps.
    pub fn new<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Step>,
    {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    pub fn pretty_name(mut self, name: impl Into<String>) -> Self {
        self.pretty_name = Some(name.into());
        self
    }

    /// Guards the job with an expression.
    pub fn if_expression(mut self, expression: impl Into<String>) -> Self {
        self.if_expression = Some(expression.into());
        self
    }

    /// Sets the runner.
    pub fn runs_on(mut self, runner: impl Into<Runner>) -> Self {
        self.runs_on = Some(runner.into());
        self
    }

    /// Sets the timeout in minutes.
    pub fn timeout(mut self, minutes: u32) -> Self {
        self.timeout = Some(minutes);
        self
    }

    /// Waits for another job.
    pub fn depends_on(mut self, job: impl Into<String>) -> Self {
        self.depends_on.push(job.into());
        self
    }

    /// Sets the concurrency group of the job.
    pub fn concurrency(mut self, group: ConcurrencyGroup) -> Self {
        self.concurrency = Concurrency::Group(group);
        self
    }

    /// Runs the job once per cell of a matrix.
    pub fn matrix(mut self, matrix: impl Into<Matrix>) -> Self {
        self.matrix = Some(matrix.into());
        self
    }

    /// Exposes an output of the job.
    pub fn output(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }
}

/// A job that delegates to a reusable workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsesJob {
    /// The display name, rendered as `name`.
    pub pretty_name: Option<String>,
    /// The expression that guards the job, rendered as `if`.
    pub if_expression: Option<String>,
    /// Jobs declared earlier in the same workflow that must finish first.
    pub depends_on: Vec<String>,
    /// The reusable workflow, such as `owner/repo/.github/workflows/build.yml@main`.
    pub uses: String,
    /// The inputs of the reusable workflow.
    pub with: IndexMap<String, Scalar>,
    /// The secrets passed to the reusable workflow.
    pub secrets: Option<Secrets>,
    /// The deployment environment.
    pub environment: Option<String>,
}

impl UsesJob {
    /// Creates a job delegating to a reusable workflow.
    pub fn new(uses: impl Into<String>) -> Self {
        Self {
            uses: uses.into(),
            ..Self::default()
        }
    }

    /// Adds an input of the reusable workflow.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with.insert(name.into(), value.into());
        self
    }

    /// Sets the secrets passed to the reusable workflow.
    pub fn secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Waits for another job.
    pub fn depends_on(mut self, job: impl Into<String>) -> Self {
        self.depends_on.push(job.into());
        self
    }
}

/// The secrets passed to a reusable workflow.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secrets {
    /// Passes every secret of the caller, rendered as `inherit`.
    Inherit,
    /// Passes the given secrets.
    Mapping(IndexMap<String, String>),
}

impl Serialize for Secrets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Inherit => serializer.serialize_str("inherit"),
            Self::Mapping(secrets) => secrets.serialize(serializer),
        }
    }
}

/// The permissions granted to the `GITHUB_TOKEN` of a job.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// `read-all`
    ReadAll,
    /// `write-all`
    WriteAll,
    /// Scope by scope, such as `contents: read`.
    Scoped(IndexMap<String, String>),
}

impl<K, V> FromIterator<(K, V)> for Permissions
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Scoped(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::ReadAll => serializer.serialize_str("read-all"),
            Self::WriteAll => serializer.serialize_str("write-all"),
            Self::Scoped(scopes) => scopes.serialize(serializer),
        }
    }
}

/// Selects the machine a job runs on.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runner {
    /// A single runner label, such as `ubuntu-22.04`.
    Label(String),
    /// All of the given labels, such as `["self-hosted", "standard-runner"]`.
    Labels(Vec<String>),
    /// A runner group, optionally narrowed by labels.
    Group {
        /// The name of the group.
        group: String,
        /// The labels narrowing the group.
        labels: Vec<String>,
    },
}

impl Runner {
    /// A self-hosted runner with the given label.
    pub fn self_hosted(label: impl Into<String>) -> Self {
        Self::Labels(vec![String::from("self-hosted"), label.into()])
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::Label(DEFAULT_RUNNER.to_owned())
    }
}

impl From<&str> for Runner {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl From<String> for Runner {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

impl Serialize for Runner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Label(label) => serializer.serialize_str(label),
            Self::Labels(labels) => labels.serialize(serializer),
            Self::Group { group, labels } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("group", group)?;
                if !labels.is_empty() {
                    map.serialize_entry("labels", labels)?;
                }
                map.end()
            }
        }
    }
}

/// A service container running next to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Service {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Extra `docker create` options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
}

/// Registry credentials of a [`Service`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A named lane in which only one run may proceed at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyGroup {
    /// The group, namespaced by the workflow and job names when set on a job.
    pub group_suffix: String,
    /// Whether a new run cancels the one in progress.
    pub cancel_previous: bool,
}

impl ConcurrencyGroup {
    /// Creates a concurrency group.
    pub fn new(group_suffix: impl Into<String>, cancel_previous: bool) -> Self {
        Self {
            group_suffix: group_suffix.into(),
            cancel_previous,
        }
    }
}

/// The concurrency control of a workflow or a job.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Concurrency {
    /// Never configured.
    #[default]
    Unset,
    /// Explicitly cleared: no concurrency control.
    Disabled,
    /// Runs in the given group.
    Group(ConcurrencyGroup),
}

impl Concurrency {
    /// The group, if any.
    pub fn group(&self) -> Option<&ConcurrencyGroup> {
        match self {
            Self::Group(group) => Some(group),
            Self::Unset | Self::Disabled => None,
        }
    }
}

impl From<Option<ConcurrencyGroup>> for Concurrency {
    fn from(group: Option<ConcurrencyGroup>) -> Self {
        group.map_or(Self::Disabled, Self::Group)
    }
}

/// The axes a job is run over.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Matrix {
    /// A raw expression, such as `${{ fromJSON(needs.setup.outputs.matrix) }}`.
    Expression(String),
    /// Named axes with optional extra and excluded combinations.
    Axes(MatrixAxes),
}

impl From<MatrixAxes> for Matrix {
    fn from(axes: MatrixAxes) -> Self {
        Self::Axes(axes)
    }
}

impl From<&str> for Matrix {
    fn from(expression: &str) -> Self {
        Self::Expression(expression.to_owned())
    }
}

/// A combination of matrix values.
pub type MatrixRecord = IndexMap<String, Scalar>;

/// Named axes of a [`Matrix`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixAxes {
    /// The values of each axis, in order.
    pub axes: IndexMap<String, Vec<Scalar>>,
    /// Extra combinations, merged in verbatim.
    pub include: Vec<MatrixRecord>,
    /// Combinations to leave out.
    pub exclude: Vec<MatrixRecord>,
}

impl MatrixAxes {
    /// The names a matrix axis cannot take.
    pub const RESERVED: [&str; 2] = ["include", "exclude"];

    /// Adds an axis.
    pub fn axis<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.axes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds an extra combination.
    pub fn include<I, K, V>(mut self, record: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        self.include.push(collect_record(record));
        self
    }

    /// Leaves a combination out.
    pub fn exclude<I, K, V>(mut self, record: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        self.exclude.push(collect_record(record));
        self
    }
}

fn collect_record<I, K, V>(record: I) -> MatrixRecord
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Scalar>,
{
    record
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_concurrency_is_not_unsetting_it() {
        assert_eq!(Concurrency::from(None), Concurrency::Disabled);
        assert_ne!(Concurrency::Disabled, Concurrency::default());
        assert!(Concurrency::Disabled.group().is_none());
    }

    #[test]
    fn runners_render_in_every_shape() {
        let render = |runner: &Runner| serde_yaml::to_string(runner).expect("runner serializes");

        assert_eq!(render(&Runner::default()), "ubuntu-22.04\n");
        assert_eq!(
            render(&Runner::self_hosted("standard-runner")),
            "- self-hosted\n- standard-runner\n"
        );
        assert_eq!(
            render(&Runner::Group {
                group: String::from("large"),
                labels: Vec::new()
            }),
            "group: large\n"
        );
    }

    #[test]
    fn secrets_and_permissions_render_keywords() {
        assert_eq!(serde_yaml::to_string(&Secrets::Inherit).expect("serializes"), "inherit\n");
        assert_eq!(serde_yaml::to_string(&Permissions::ReadAll).expect("serializes"), "read-all\n");

        let scoped: Permissions = [("contents", "read"), ("pull-requests", "write")]
            .into_iter()
            .collect();
        assert_eq!(
            serde_yaml::to_string(&scoped).expect("serializes"),
            "contents: read\npull-requests: write\n"
        );
    }

    #[test]
    fn steps_of_uses_jobs_are_empty() {
        let job = Job::from(UsesJob::new("example/example/.github/workflows/example1.yml@main"));
        assert!(job.steps().is_empty());

        let job = Job::from(StepsJob::new([Step::run("exit 0")]).depends_on("build"));
        assert_eq!(job.steps().len(), 1);
        assert_eq!(job.depends_on(), ["build"]);
    }
}
