use indexmap::IndexMap;
use tracing::warn;

use super::Scalar;

/// A single step of a job: either a shell command or an invocation of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The id other steps use to refer to this step's outputs.
    pub id: Option<String>,
    /// The display name.
    pub name: Option<String>,
    /// Environment variables of this step only.
    pub env: IndexMap<String, String>,
    /// The expression that guards the step, rendered as `if`.
    pub if_expression: Option<String>,
    /// The directory the command runs in.
    pub working_directory: Option<String>,
    /// Whether the job goes on when this step fails.
    pub continue_on_error: Option<bool>,
    /// The timeout in minutes.
    pub timeout: Option<u32>,
    /// What the step does.
    pub kind: StepKind,
}

/// Discriminates run steps from uses steps.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Runs a shell command.
    Run(String),
    /// Invokes an action by its symbolic reference, such as `actions/checkout@v4`.
    Uses {
        /// The symbolic action reference.
        uses: String,
        /// The inputs of the action.
        with: IndexMap<String, Scalar>,
    },
}

impl Step {
    fn new(kind: StepKind) -> Self {
        Self {
            id: None,
            name: None,
            env: IndexMap::new(),
            if_expression: None,
            working_directory: None,
            continue_on_error: None,
            timeout: None,
            kind,
        }
    }

    /// Creates a step that runs a shell command.
    pub fn run(command: impl Into<String>) -> Self {
        Self::new(StepKind::Run(command.into()))
    }

    /// Creates a step that invokes an action.
    pub fn uses(reference: impl Into<String>) -> Self {
        Self::new(StepKind::Uses {
            uses: reference.into(),
            with: IndexMap::new(),
        })
    }

    /// Sets the id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an environment variable, replacing any previous value of the same name.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Guards the step with an expression.
    pub fn if_expression(mut self, expression: impl Into<String>) -> Self {
        self.if_expression = Some(expression.into());
        self
    }

    /// Sets the working directory.
    pub fn working_directory(mut self, directory: impl Into<String>) -> Self {
        self.working_directory = Some(directory.into());
        self
    }

    /// Lets the job go on when this step fails.
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = Some(continue_on_error);
        self
    }

    /// Sets the timeout in minutes.
    pub fn timeout(mut self, minutes: u32) -> Self {
        self.timeout = Some(minutes);
        self
    }

    /// Adds an input of the invoked action, replacing any previous value of the same name.
    ///
    /// Run steps take no inputs: the input is dropped with a warning and the step is returned untouched.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        match &mut self.kind {
            StepKind::Uses { with, .. } => {
                with.insert(name.into(), value.into());
            }
            StepKind::Run(command) => {
                let name: String = name.into();
                warn!("dropping input {name} of run step `{command}`");
            }
        }
        self
    }

    /// The symbolic action reference of a uses step.
    pub fn action_reference(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Uses { uses, .. } => Some(uses),
            StepKind::Run(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_uses_steps_reference_actions() {
        assert_eq!(
            Step::uses("actions/checkout@v4").action_reference(),
            Some("actions/checkout@v4")
        );
        assert_eq!(Step::run("exit 0").action_reference(), None);
    }

    #[test]
    fn inputs_only_apply_to_uses_steps() {
        let step = Step::uses("actions/checkout@v4").with("ref", "main").with("fetch-depth", 0);
        let StepKind::Uses { with, .. } = &step.kind else {
            panic!("expected a uses step");
        };
        assert_eq!(with.get("ref"), Some(&Scalar::from("main")));
        assert_eq!(with.get("fetch-depth"), Some(&Scalar::Integer(0)));

        assert_eq!(Step::run("exit 0").with("ref", "main"), Step::run("exit 0"));
    }
}
