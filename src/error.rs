use std::path::PathBuf;

use thiserror::Error;

use crate::tool::ToolKind;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("The following files are missing:\n{}", format_paths(.paths))]
    MissingFiles { paths: Vec<PathBuf> },

    #[error("Error running {tool} ({status}):\n{output}")]
    ExternalTool {
        tool: ToolKind,
        status: String,
        output: String,
    },

    #[error("Template references undefined placeholders: {}", .keys.join(", "))]
    Template { keys: Vec<String> },

    #[error("Task error: {0}")]
    Task(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("IO error at {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::Config(msg.into())
    }

    /// Attach the offending path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::IoAt {
            path: path.into(),
            source,
        }
    }

    pub fn step_failed(step: impl Into<String>, source: BuildError) -> Self {
        BuildError::StepFailed {
            step: step.into(),
            source: Box::new(source),
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<toml::de::Error> for BuildError {
    fn from(err: toml::de::Error) -> Self {
        BuildError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for BuildError {
    fn from(err: serde_yaml::Error) -> Self {
        BuildError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
