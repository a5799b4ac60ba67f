//! Build pipeline for JavaScript libraries.
//!
//! Sources are joined in a fixed order under a generated license header,
//! the version and build number are tracked in a persisted file, and external
//! tools lint, minify and pack the result. Steps form an explicit
//! [`TaskGraph`] that an [`Executor`] walks one step at a time, stopping at
//! the first failure.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod join;
pub mod license;
pub mod output;
pub mod project;
pub mod task;
pub mod tool;
pub mod version;

pub use config::{ArtifactPaths, ProjectConfig, load_project};
pub use error::{BuildError, Result};
pub use execution::{Executor, StepState};
pub use join::FileJoiner;
pub use project::JsProject;
pub use task::{Action, Step, StepRunner, TaskGraph};
pub use tool::{CommandTool, ExternalTool, ToolInvocation, ToolKind};
pub use version::{Version, VersionPart, VersionState, VersionStore};
