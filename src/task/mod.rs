pub mod definitions;
pub mod dependency;

use crate::{error::Result, version::VersionPart};

pub use dependency::TaskGraph;

/// What a step does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Remove the distribution directory.
    Clean,
    /// Create the distribution directory.
    CreateDistDir,
    /// Bump the build number and render the license file.
    Prepare,
    /// Join the sources into the distribution file.
    Join,
    Lint,
    Minify,
    Pack,
    ShowVersion,
    BumpVersion(VersionPart),
    BumpBuildNumber,
    /// Nothing of its own; only pulls in dependencies.
    Composite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub aliases: Vec<String>,
    pub action: Action,
}

impl Step {
    pub fn new(id: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            dependencies: Vec::new(),
            aliases: Vec::new(),
            action,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Carries out the action of a single step. The executor guarantees every
/// dependency of `step` has already succeeded.
#[allow(async_fn_in_trait)]
pub trait StepRunner {
    async fn run_step(&mut self, step: &Step) -> Result<()>;
}
